// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine core: supervisor, worker pool, per-user sessions and loops.

pub mod poll;
pub mod pool;
pub mod session;
pub mod tick;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::engine::poll::{run_user_loop, PollContext};
use crate::engine::pool::WorkerPool;
use crate::engine::session::{UserSession, UserState, UserStatus};
use crate::store::allowlist::AllowList;
use crate::store::settings::SettingsStore;

/// Result of a start request, rendered to the requesting chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    NotAllowed,
    NoQueries,
}

impl StartOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::AlreadyRunning => "already running",
            Self::NotAllowed => "not allowed",
            Self::NoQueries => "no queries configured",
        }
    }
}

/// Aggregate engine counters for the stats tick and status commands.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub active_users: usize,
    pub paused_users: usize,
    pub requests: u64,
    pub items_found: u64,
    pub errors: u64,
    pub workers_in_use: usize,
}

/// Wires allow-list, stores, pool and loops; exposes lifecycle control to
/// the chat front-end.
pub struct Supervisor {
    allowlist: Arc<AllowList>,
    settings: Arc<SettingsStore>,
    pool: Arc<WorkerPool>,
    ctx: Arc<PollContext>,
    sessions: RwLock<HashMap<u64, Arc<UserSession>>>,
    /// Counters carried over from loops that already exited.
    retired_requests: AtomicU64,
    retired_items: AtomicU64,
    retired_errors: AtomicU64,
    shutdown_grace: Duration,
    /// Stops periodic tasks at the start of shutdown.
    ticker_shutdown: CancellationToken,
}

impl Supervisor {
    pub fn new(
        allowlist: Arc<AllowList>,
        settings: Arc<SettingsStore>,
        pool: Arc<WorkerPool>,
        ctx: Arc<PollContext>,
        shutdown_grace: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            allowlist,
            settings,
            pool,
            ctx,
            sessions: RwLock::new(HashMap::new()),
            retired_requests: AtomicU64::new(0),
            retired_items: AtomicU64::new(0),
            retired_errors: AtomicU64::new(0),
            shutdown_grace,
            ticker_shutdown: CancellationToken::new(),
        })
    }

    /// Token cancelled when shutdown begins; periodic tasks watch it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.ticker_shutdown.clone()
    }

    /// Start a polling loop for a user.
    ///
    /// The allow-list gate runs before any session state is created, so a
    /// refused user causes no request traffic at all. At most one loop per
    /// user id exists at any instant.
    pub async fn start(self: &Arc<Self>, user_id: u64, queries: Vec<String>) -> StartOutcome {
        if !self.allowlist.contains(user_id) {
            tracing::info!(user_id, "start refused: not in allow-list");
            return StartOutcome::NotAllowed;
        }

        let queries: Vec<String> =
            queries.into_iter().map(|q| q.trim().to_owned()).filter(|q| !q.is_empty()).collect();
        if queries.is_empty() {
            tracing::info!(user_id, "start refused: no queries");
            return StartOutcome::NoQueries;
        }

        let session = {
            let mut sessions = self.sessions.write().await;
            if let Some(existing) = sessions.get(&user_id) {
                if existing.state() != UserState::Stopped {
                    return StartOutcome::AlreadyRunning;
                }
            }
            let settings = self.settings.load(user_id);
            let session = Arc::new(UserSession::new(user_id, queries, settings));
            sessions.insert(user_id, Arc::clone(&session));
            session
        };

        // Submit outside the registry lock: a saturated pool runs the loop
        // on this task, and retirement needs the lock back.
        let supervisor = Arc::clone(self);
        let ctx = Arc::clone(&self.ctx);
        let loop_session = Arc::clone(&session);
        let label = format!("user-{user_id}");
        let outcome = self
            .pool
            .submit(&label, async move {
                run_user_loop(ctx, Arc::clone(&loop_session)).await;
                supervisor.retire(&loop_session).await;
            })
            .await;
        tracing::debug!(user_id, outcome = ?outcome, "loop submitted");
        StartOutcome::Started
    }

    /// Remove an exited session from the registry, keeping its counters.
    async fn retire(&self, session: &Arc<UserSession>) {
        let mut sessions = self.sessions.write().await;
        // A newer session may already occupy the slot.
        let same = sessions
            .get(&session.user_id)
            .is_some_and(|current| Arc::ptr_eq(current, session));
        if same {
            sessions.remove(&session.user_id);
        }
        let status = session.status();
        self.retired_requests.fetch_add(status.requests, Ordering::Relaxed);
        self.retired_items.fetch_add(status.items_found, Ordering::Relaxed);
        self.retired_errors.fetch_add(status.errors, Ordering::Relaxed);
    }

    /// Request a cooperative stop. Returns false for an unknown user.
    pub async fn stop(&self, user_id: u64) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&user_id) {
            Some(session) => {
                session.request_stop();
                true
            }
            None => false,
        }
    }

    pub async fn pause(&self, user_id: u64) -> bool {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).is_some_and(|session| session.pause())
    }

    pub async fn resume(&self, user_id: u64) -> bool {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).is_some_and(|session| session.resume())
    }

    pub async fn status(&self, user_id: u64) -> Option<UserStatus> {
        let sessions = self.sessions.read().await;
        sessions.get(&user_id).map(|session| session.status())
    }

    pub async fn global_stats(&self) -> GlobalStats {
        let sessions = self.sessions.read().await;
        let mut stats = GlobalStats {
            active_users: 0,
            paused_users: 0,
            requests: self.retired_requests.load(Ordering::Relaxed),
            items_found: self.retired_items.load(Ordering::Relaxed),
            errors: self.retired_errors.load(Ordering::Relaxed),
            workers_in_use: self.pool.workers_in_use(),
        };
        for session in sessions.values() {
            match session.state() {
                UserState::Running | UserState::Stopping => stats.active_users += 1,
                UserState::Paused => stats.paused_users += 1,
                UserState::Stopped => {}
            }
            let status = session.status();
            stats.requests += status.requests;
            stats.items_found += status.items_found;
            stats.errors += status.errors;
        }
        stats
    }

    /// Stop everything: cooperative first, force-cancel after the grace
    /// period, then release token-manager resources.
    pub async fn shutdown(&self) {
        tracing::info!("supervisor shutting down");
        self.ticker_shutdown.cancel();
        {
            let sessions = self.sessions.read().await;
            for session in sessions.values() {
                session.request_stop();
            }
        }

        if !self.wait_drained(self.shutdown_grace).await {
            tracing::warn!("shutdown grace elapsed, force-cancelling in-flight requests");
            self.ctx.shutdown.cancel();
            self.wait_drained(Duration::from_secs(2)).await;
        }
        self.ctx.tokens.shutdown();
        tracing::info!("supervisor stopped");
    }

    async fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.sessions.read().await.is_empty() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
