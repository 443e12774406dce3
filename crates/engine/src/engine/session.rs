// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user in-memory session state.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::model::epoch_ms;
use crate::settings::UserSettings;

/// Lifecycle state of one user's polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    Running,
    Paused,
    Stopping,
    Stopped,
}

impl UserState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Paused => 1,
            Self::Stopping => 2,
            Self::Stopped => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Running,
            1 => Self::Paused,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

/// In-memory state for one user's loop task.
///
/// Mutated only by the user's own loop and by supervisor control calls;
/// everything shared is atomic.
pub struct UserSession {
    pub user_id: u64,
    pub queries: Vec<String>,
    pub settings: UserSettings,
    state: AtomicU8,
    pub requests: AtomicU64,
    pub items_found: AtomicU64,
    pub errors: AtomicU64,
    last_error: parking_lot::RwLock<Option<String>>,
    pub last_iteration_at: AtomicU64,
    /// Wakes the loop's sleeps so stop latency stays under a second.
    pub cancel: CancellationToken,
}

/// Point-in-time view of a session for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct UserStatus {
    pub user_id: u64,
    pub state: UserState,
    pub queries: Vec<String>,
    pub requests: u64,
    pub items_found: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_iteration_at: u64,
}

impl UserSession {
    /// New session in RUNNING state.
    pub fn new(user_id: u64, queries: Vec<String>, settings: UserSettings) -> Self {
        Self {
            user_id,
            queries,
            settings,
            state: AtomicU8::new(UserState::Running.as_u8()),
            requests: AtomicU64::new(0),
            items_found: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_error: parking_lot::RwLock::new(None),
            last_iteration_at: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> UserState {
        UserState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: UserState, to: UserState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// RUNNING → PAUSED. Returns false from any other state.
    pub fn pause(&self) -> bool {
        self.transition(UserState::Running, UserState::Paused)
    }

    /// PAUSED → RUNNING. Returns false from any other state.
    pub fn resume(&self) -> bool {
        self.transition(UserState::Paused, UserState::Running)
    }

    /// RUNNING|PAUSED → STOPPING, waking any sleep. Returns false if the
    /// session was already stopping or stopped.
    pub fn request_stop(&self) -> bool {
        let requested = self.transition(UserState::Running, UserState::Stopping)
            || self.transition(UserState::Paused, UserState::Stopping);
        if requested {
            self.cancel.cancel();
        }
        requested
    }

    /// Terminal transition, called by the loop on exit.
    pub fn mark_stopped(&self) {
        self.state.store(UserState::Stopped.as_u8(), Ordering::Release);
    }

    pub fn record_error(&self, detail: impl Into<String>) {
        let detail = detail.into();
        self.errors.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(user_id = self.user_id, %detail, "loop error recorded");
        *self.last_error.write() = Some(detail);
    }

    pub fn touch_iteration(&self) {
        self.last_iteration_at.store(epoch_ms(), Ordering::Relaxed);
    }

    pub fn status(&self) -> UserStatus {
        UserStatus {
            user_id: self.user_id,
            state: self.state(),
            queries: self.queries.clone(),
            requests: self.requests.load(Ordering::Relaxed),
            items_found: self.items_found.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
            last_iteration_at: self.last_iteration_at.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
