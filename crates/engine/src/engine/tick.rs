// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic aggregate stats logging.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::Supervisor;

/// Spawn the stats tick. Stops when supervisor shutdown begins.
pub fn spawn_stats_ticker(supervisor: Arc<Supervisor>, interval: Duration) {
    let shutdown = supervisor.shutdown_token();
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // Skip the immediate first tick; there is nothing to report yet.
        timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }
            let stats = supervisor.global_stats().await;
            tracing::info!(
                active_users = stats.active_users,
                paused_users = stats.paused_users,
                requests = stats.requests,
                items_found = stats.items_found,
                errors = stats.errors,
                workers_in_use = stats.workers_in_use,
                "engine stats"
            );
        }
    });
}
