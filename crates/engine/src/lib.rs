// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleawatch: multi-tenant marketplace polling engine.
//!
//! Polls authenticated search queries per user, filters results against
//! per-user history, and pushes novel items as chat notifications.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod model;
pub mod notify;
pub mod settings;
pub mod store;
pub mod test_support;
pub mod token;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::goofish::GoofishAdapter;
use crate::adapter::SiteAdapter;
use crate::config::{AppConfig, EngineConfig};
use crate::engine::poll::PollContext;
use crate::engine::pool::WorkerPool;
use crate::engine::tick::spawn_stats_ticker;
use crate::engine::Supervisor;
use crate::notify::{LogNotifier, Notifier};
use crate::store::allowlist::AllowList;
use crate::store::backup::BackupManager;
use crate::store::history::HistoryStore;
use crate::store::items::ItemStore;
use crate::store::settings::SettingsStore;
use crate::store::DataLayout;
use crate::token::manager::{RefreshReason, TokenManager};
use crate::token::provider::{CookieFileProvider, TokenProvider};

const SITE_DOMAIN: &str = "goofish";

/// Run the engine until shutdown.
pub async fn run(flags: EngineConfig) -> anyhow::Result<()> {
    let app = AppConfig::load(&flags.config)?;
    let data_dir = flags.data_dir.clone().unwrap_or_else(|| app.storage.data_dir.clone());
    let layout = DataLayout::new(data_dir);
    let backup = BackupManager::new(layout.backups_dir(), app.storage.backup_enabled);

    let allowlist = Arc::new(AllowList::load(layout.whitelist_file(), backup.clone())?);
    let history =
        Arc::new(HistoryStore::new(layout.clone(), app.storage.history_max_entries));
    let audit = Arc::new(ItemStore::new(layout.clone(), app.storage.items_max_per_user));
    let settings =
        Arc::new(SettingsStore::new(layout.clone(), app.defaults.clone(), backup.clone()));

    let tokens = TokenManager::new(
        app.token.clone(),
        Box::new(CookieFileProvider::new(layout.cookies_file(), SITE_DOMAIN)),
        layout.cookies_file(),
        SITE_DOMAIN,
        backup,
    );

    // Seed from the persisted jar; its age is unknown, so the throttle
    // stays unarmed and the first auth error may refresh immediately.
    let seeder = CookieFileProvider::new(layout.cookies_file(), SITE_DOMAIN);
    match seeder.fetch().await {
        Ok(cookies) => tokens.seed(cookies),
        Err(e) => info!(err = %e, "no persisted cookies to seed from"),
    }
    if !tokens.test() && app.token.dynamic_enabled {
        if let Err(e) = tokens.refresh(RefreshReason::Startup).await {
            tracing::warn!(err = %e, "startup token refresh failed");
        }
    }
    if !tokens.test() {
        anyhow::bail!(
            "no usable session token: provide {} or enable cookie.dynamic.enabled",
            layout.cookies_file().display()
        );
    }

    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
    tokens.spawn_proactive(Arc::clone(&notifier));

    let adapter = Arc::new(GoofishAdapter::new(app.adapter.clone(), &app.http)?);
    let ctx = Arc::new(PollContext {
        adapter: adapter as Arc<dyn SiteAdapter>,
        tokens: Arc::clone(&tokens),
        history,
        audit,
        notifier,
        http: app.http.clone(),
        notify_delay: app.notify_delay,
        shutdown: CancellationToken::new(),
    });

    let pool = WorkerPool::new(&app.pool);
    let supervisor = Supervisor::new(allowlist, settings, pool, ctx, app.shutdown_grace);
    spawn_stats_ticker(Arc::clone(&supervisor), app.stats_interval);

    info!(data_dir = %layout.root().display(), "fleawatch engine ready");

    wait_for_shutdown_signal().await;
    supervisor.shutdown().await;
    Ok(())
}

/// Block until SIGTERM or SIGINT; a second signal forces exit.
async fn wait_for_shutdown_signal() {
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
    let mut sigint =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

    tokio::select! {
        _ = async {
            if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
        } => {
            info!("received SIGTERM");
        }
        _ = async {
            if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
        } => {
            info!("received SIGINT");
        }
    }

    // Second signal during graceful shutdown: force exit.
    tokio::spawn(async move {
        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {}
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {}
        }
        info!("received second signal, forcing exit");
        std::process::exit(130);
    });
}
