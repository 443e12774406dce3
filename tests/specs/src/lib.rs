// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end engine scenarios.
//!
//! Wires the real supervisor, stores, and token manager over a temp data
//! dir with a scripted adapter, recording notifier, and canned token
//! provider.

use std::time::Duration;

pub use fleawatch::test_support::{
    aged_item, test_settings, MockAdapter, RecordingNotifier, SeedProvider, Sent, TestEngine,
    TestEngineBuilder,
};

/// Wait (virtual time, under a paused runtime) until `check` passes.
pub async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(check(), "condition never became true");
}

/// Wait until a user's loop has retired itself from the registry.
pub async fn wait_retired(engine: &TestEngine, user_id: u64) {
    for _ in 0..10_000 {
        if engine.supervisor.status(user_id).await.is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(
        engine.supervisor.status(user_id).await.is_none(),
        "loop for user {user_id} never retired"
    );
}
