// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification delivery interface toward the chat front-end.

use std::future::Future;
use std::pin::Pin;

use crate::model::Item;

/// Chat delivery capability.
///
/// Implementations live with the chat front-end; the engine only counts
/// failures and keeps polling. Object-safe for use as `Arc<dyn Notifier>`.
pub trait Notifier: Send + Sync + 'static {
    fn send_text(
        &self,
        user_id: u64,
        text: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    fn send_photo(
        &self,
        user_id: u64,
        photo_url: String,
        caption: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Operational notice to the configured admin, if any.
    fn send_admin(&self, text: String)
        -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}

/// Plain-text caption for one found item.
pub fn render_item_caption(item: &Item) -> String {
    let mut lines = Vec::new();
    let title = if item.title.is_empty() { "(no title)" } else { &item.title };
    lines.push(format!("{title} — {}", item.price_display()));
    if !item.location.is_empty() {
        lines.push(item.location.clone());
    }
    if let Some(ts) = item.publish_time {
        let age_min = crate::model::epoch_ms().saturating_sub(ts) / 60_000;
        lines.push(format!("listed {age_min} min ago"));
    }
    if !item.url.is_empty() {
        lines.push(item.url.clone());
    }
    lines.join("\n")
}

/// Notifier that writes deliveries to the log. Used when no chat front-end
/// is wired in (operational default for the bare binary).
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_text(
        &self,
        user_id: u64,
        text: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(user_id, %text, "notify");
            Ok(())
        })
    }

    fn send_photo(
        &self,
        user_id: u64,
        photo_url: String,
        caption: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::info!(user_id, %photo_url, %caption, "notify photo");
            Ok(())
        })
    }

    fn send_admin(
        &self,
        text: String,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async move {
            tracing::warn!(%text, "admin notice");
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
