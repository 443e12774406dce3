// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session-token manager: owns the current token, runs refreshes.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::TokenConfig;
use crate::model::epoch_ms;
use crate::notify::Notifier;
use crate::store::atomic_write;
use crate::store::backup::BackupManager;
use crate::token::provider::TokenProvider;
use crate::token::SessionToken;

/// Why a refresh was requested. Logged and used for admin notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Startup,
    Periodic,
    AuthError,
}

impl RefreshReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Periodic => "periodic",
            Self::AuthError => "auth-error",
        }
    }
}

/// Owns exactly one current [`SessionToken`].
///
/// Reads are a lock-free-in-practice snapshot clone; replacement swaps the
/// whole `Arc` so no worker ever observes a half-updated cookie jar.
/// Concurrent refreshes collapse into one provider call: callers serialize
/// on `refresh_gate`, and whoever enters after a completed refresh finds
/// `last_refresh_ms` inside the throttle window and takes the fresh token.
pub struct TokenManager {
    current: parking_lot::RwLock<Arc<SessionToken>>,
    refresh_gate: tokio::sync::Mutex<()>,
    last_refresh_ms: AtomicU64,
    provider: Box<dyn TokenProvider>,
    config: TokenConfig,
    /// `cookies.properties` path for persistence; refresh survives restarts.
    cookies_path: PathBuf,
    domain: String,
    backup: BackupManager,
    shutdown: CancellationToken,
}

impl TokenManager {
    pub fn new(
        config: TokenConfig,
        provider: Box<dyn TokenProvider>,
        cookies_path: PathBuf,
        domain: impl Into<String>,
        backup: BackupManager,
    ) -> Arc<Self> {
        Arc::new(Self {
            current: parking_lot::RwLock::new(Arc::new(SessionToken::never())),
            refresh_gate: tokio::sync::Mutex::new(()),
            last_refresh_ms: AtomicU64::new(0),
            provider,
            config,
            cookies_path,
            domain: domain.into(),
            backup,
            shutdown: CancellationToken::new(),
        })
    }

    /// Install a statically configured cookie jar at startup.
    ///
    /// Does not arm the throttle: a seed token of unknown age must not
    /// suppress the first reactive refresh.
    pub fn seed(&self, cookies: BTreeMap<String, String>) {
        let token = Arc::new(SessionToken::from_cookies(cookies));
        tracing::info!(
            cookie_count = token.cookies.len(),
            has_seed = !token.token_seed.is_empty(),
            "session token seeded from storage"
        );
        *self.current.write() = token;
    }

    /// Latest successfully installed token, or the never-initialized sentinel.
    pub fn current(&self) -> Arc<SessionToken> {
        Arc::clone(&self.current.read())
    }

    /// Cheap probe that the current token looks usable.
    pub fn test(&self) -> bool {
        let token = self.current();
        token.is_initialized() && !token.token_seed.is_empty()
    }

    /// Obtain and install a fresh token.
    ///
    /// Inside the throttle window this is a no-op returning the current
    /// token — reactive callers treat that as "already refreshed" and retry
    /// their request once. With `cookie.dynamic.enabled=false` the provider
    /// is never invoked.
    pub async fn refresh(&self, reason: RefreshReason) -> anyhow::Result<Arc<SessionToken>> {
        if !self.config.dynamic_enabled {
            tracing::debug!(reason = reason.as_str(), "dynamic refresh disabled, keeping static token");
            return Ok(self.current());
        }

        let _gate = self.refresh_gate.lock().await;

        let now = epoch_ms();
        let last = self.last_refresh_ms.load(Ordering::Acquire);
        let window_ms = self.config.min_refresh_interval.as_millis() as u64;
        if last > 0 && now.saturating_sub(last) < window_ms {
            tracing::debug!(
                reason = reason.as_str(),
                since_ms = now.saturating_sub(last),
                "refresh throttled, current token considered fresh"
            );
            return Ok(self.current());
        }

        let cookies = self
            .provider
            .fetch()
            .await
            .map_err(|e| anyhow::anyhow!("token provider ({}): {e}", reason.as_str()))?;
        let token = Arc::new(SessionToken::from_cookies(cookies));

        *self.current.write() = Arc::clone(&token);
        self.last_refresh_ms.store(epoch_ms(), Ordering::Release);
        tracing::info!(
            reason = reason.as_str(),
            cookie_count = token.cookies.len(),
            has_seed = !token.token_seed.is_empty(),
            "session token refreshed"
        );

        self.persist(&token);
        Ok(token)
    }

    /// Write the refreshed jar back to `cookies.properties` so a restart
    /// does not require an immediate fresh fetch. Best-effort.
    fn persist(&self, token: &SessionToken) {
        let contents = format!("{}.cookies = {}\n", self.domain, token.cookie_header());
        if let Err(e) = atomic_write(&self.cookies_path, contents.as_bytes()) {
            tracing::warn!(err = %e, "failed to persist refreshed cookies");
            return;
        }
        self.backup.backup_file(&self.cookies_path);
    }

    /// Spawn the proactive refresh tick (gated by `cookie.auto.update`).
    ///
    /// Failures are logged, reported to the admin, and retried on the next
    /// tick; the installed token stays valid throughout.
    pub fn spawn_proactive(self: &Arc<Self>, notifier: Arc<dyn Notifier>) {
        if !self.config.auto_update || !self.config.dynamic_enabled {
            tracing::debug!("proactive token refresh disabled by config");
            return;
        }
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(manager.config.update_interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The immediate first tick would race the startup seed.
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = manager.shutdown.cancelled() => break,
                    _ = timer.tick() => {}
                }
                if let Err(e) = manager.refresh(RefreshReason::Periodic).await {
                    tracing::warn!(err = %e, "proactive token refresh failed");
                    let notice = format!("proactive token refresh failed: {e:#}");
                    if let Err(send_err) = notifier.send_admin(notice).await {
                        tracing::debug!(err = %send_err, "admin notice delivery failed");
                    }
                }
            }
        });
    }

    /// Stop periodic tasks and release provider resources.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
