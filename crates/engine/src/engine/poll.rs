// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-user polling loop: search, filter, diff, notify, persist, sleep.

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::adapter::{SearchError, SiteAdapter};
use crate::config::HttpConfig;
use crate::engine::session::{UserSession, UserState};
use crate::model::{epoch_ms, filter_by_age, Item};
use crate::notify::{render_item_caption, Notifier};
use crate::store::history::HistoryStore;
use crate::store::items::ItemStore;
use crate::token::manager::{RefreshReason, TokenManager};

/// Backoff after a blocked or transient search failure.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Shared collaborators for all user loops.
pub struct PollContext {
    pub adapter: Arc<dyn SiteAdapter>,
    pub tokens: Arc<TokenManager>,
    pub history: Arc<HistoryStore>,
    pub audit: Arc<ItemStore>,
    pub notifier: Arc<dyn Notifier>,
    pub http: HttpConfig,
    /// Inter-item pacing for notification delivery.
    pub notify_delay: Duration,
    /// Process-wide force-cancel. Normal stops let in-flight requests
    /// finish; this aborts them once the shutdown grace period elapses.
    pub shutdown: CancellationToken,
}

/// Run one user's loop until stopped. Emits a final counters message.
pub async fn run_user_loop(ctx: Arc<PollContext>, session: Arc<UserSession>) {
    tracing::info!(
        user_id = session.user_id,
        queries = session.queries.len(),
        interval_s = session.settings.check_interval_s,
        "polling loop started"
    );

    loop {
        match session.state() {
            UserState::Running => {}
            UserState::Paused => {
                paused_wait(&session).await;
                continue;
            }
            UserState::Stopping | UserState::Stopped => break,
        }

        run_iteration(&ctx, &session).await;
        session.touch_iteration();

        let interval = Duration::from_secs(session.settings.check_interval_s);
        if !interruptible_sleep(&session, interval).await {
            break;
        }
    }

    session.mark_stopped();
    let status = session.status();
    tracing::info!(
        user_id = status.user_id,
        requests = status.requests,
        items_found = status.items_found,
        errors = status.errors,
        "polling loop stopped"
    );
    let summary = format!(
        "Polling stopped. Found {} items in {} requests ({} errors).",
        status.items_found, status.requests, status.errors
    );
    if let Err(e) = ctx.notifier.send_text(session.user_id, summary).await {
        tracing::debug!(user_id = session.user_id, err = %e, "final summary delivery failed");
    }
}

/// One traversal of all the user's queries.
async fn run_iteration(ctx: &PollContext, session: &UserSession) {
    for query in &session.queries {
        if session.state() != UserState::Running {
            return;
        }

        let items = collect_query(ctx, session, query).await;
        if session.state() != UserState::Running {
            return;
        }
        session.items_found.fetch_add(items.len() as u64, Ordering::Relaxed);

        let candidate_ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
        let new_ids: Vec<String> = if session.settings.notify_new_only {
            match ctx.history.filter_new(session.user_id, &candidate_ids).await {
                Ok(ids) => ids,
                Err(e) => {
                    session.record_error(format!("history read: {e:#}"));
                    continue;
                }
            }
        } else {
            let mut seen = HashSet::new();
            candidate_ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
        };

        if !new_ids.is_empty() {
            // Durable before delivery: a batch that cannot be recorded is
            // not sent (at-most-once).
            match ctx.history.mark_sent(session.user_id, &new_ids).await {
                Ok(()) => deliver(ctx, session, &items, &new_ids, query).await,
                Err(e) => session.record_error(format!("history write: {e:#}")),
            }
        }

        if let Err(e) = ctx.audit.append(session.user_id, &items).await {
            tracing::debug!(user_id = session.user_id, err = %e, "audit append failed");
        }

        if !interruptible_sleep(session, ctx.adapter.request_delay()).await {
            return;
        }
    }
}

/// Walk one query's pages, returning age-filtered items in server order.
///
/// Terminates on: empty page, a post-filter page shorter than
/// `rows_per_page`, `max_pages` reached, exhausted retries, or stop.
async fn collect_query(ctx: &PollContext, session: &UserSession, query: &str) -> Vec<Item> {
    let settings = &session.settings;
    let mut collected = Vec::new();

    'walk: for page in 1..=settings.max_pages {
        if session.state() != UserState::Running {
            break;
        }

        let mut attempt: u32 = 0;
        let page_items: Vec<Item> = loop {
            session.requests.fetch_add(1, Ordering::Relaxed);
            let token = ctx.tokens.current();
            let result = tokio::select! {
                _ = ctx.shutdown.cancelled() => break 'walk,
                r = ctx.adapter.search(query, page, settings.rows_per_page, &token) => r,
            };

            match result {
                Ok(items) => break items,
                Err(SearchError::EmptyPage) => break 'walk,
                Err(err @ SearchError::Auth(_)) => {
                    attempt += 1;
                    if attempt > ctx.http.max_retries {
                        session.record_error(format!("{query} p{page}: {err} (retries exhausted)"));
                        break 'walk;
                    }
                    if let Err(refresh_err) = ctx.tokens.refresh(RefreshReason::AuthError).await {
                        session.record_error(format!("token refresh: {refresh_err:#}"));
                        let notice =
                            format!("token refresh failed for user {}: {refresh_err:#}", session.user_id);
                        if let Err(send_err) = ctx.notifier.send_admin(notice).await {
                            tracing::debug!(err = %send_err, "admin notice delivery failed");
                        }
                        if !ctx.tokens.test() {
                            // No usable token at all: fatal for this user.
                            tracing::warn!(
                                user_id = session.user_id,
                                "no usable session token, stopping loop"
                            );
                            session.request_stop();
                        }
                        break 'walk;
                    }
                    let backoff = ctx.http.retry_delay * attempt;
                    if !interruptible_sleep(session, backoff).await {
                        break 'walk;
                    }
                }
                Err(err @ SearchError::Blocked(_)) => {
                    session.record_error(format!("{query} p{page}: {err}"));
                    let _ = interruptible_sleep(session, ERROR_BACKOFF).await;
                    break 'walk;
                }
                Err(err @ SearchError::Transient(_)) => {
                    session.record_error(format!("{query} p{page}: {err}"));
                    if !interruptible_sleep(session, ERROR_BACKOFF).await {
                        break 'walk;
                    }
                    continue 'walk;
                }
                Err(err @ SearchError::Other(_)) => {
                    session.record_error(format!("{query} p{page}: {err}"));
                    break 'walk;
                }
            }
        };

        let filtered = filter_by_age(page_items, settings.max_age_min, epoch_ms());
        let page_count = filtered.len() as u64;
        collected.extend(filtered);
        if page_count < settings.rows_per_page {
            break;
        }
    }

    collected
}

/// Deliver the new items of a batch in adapter order, paced.
async fn deliver(
    ctx: &PollContext,
    session: &UserSession,
    items: &[Item],
    new_ids: &[String],
    query: &str,
) {
    let mut pending: HashSet<&str> = new_ids.iter().map(String::as_str).collect();
    let mut first = true;
    for item in items {
        if !pending.remove(item.id.as_str()) {
            continue;
        }
        if !first && !interruptible_sleep(session, ctx.notify_delay).await {
            return;
        }
        first = false;

        let caption = render_item_caption(item);
        let result = match item.images.first() {
            Some(photo) => {
                ctx.notifier.send_photo(session.user_id, photo.clone(), caption).await
            }
            None => ctx.notifier.send_text(session.user_id, caption).await,
        };
        if let Err(e) = result {
            session.record_error(format!("notify {} ({query}): {e:#}", item.id));
        }
    }
}

/// Sleep in ≤1s slices, bailing out on stop. Returns false when the loop
/// should exit. Pausing does not interrupt the sleep; the outer loop parks
/// after it completes.
async fn interruptible_sleep(session: &UserSession, total: Duration) -> bool {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        let slice = remaining.min(Duration::from_secs(1));
        tokio::select! {
            _ = session.cancel.cancelled() => return false,
            _ = tokio::time::sleep(slice) => {}
        }
        if matches!(session.state(), UserState::Stopping | UserState::Stopped) {
            return false;
        }
        remaining = remaining.saturating_sub(slice);
    }
    true
}

/// Park while paused, waking within a second of resume or stop.
async fn paused_wait(session: &UserSession) {
    while session.state() == UserState::Paused {
        tokio::select! {
            _ = session.cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;
