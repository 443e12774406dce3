// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core data types: search result items and time helpers.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of one search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Site-assigned identifier, stable across searches.
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Price in the site's native currency units. Never negative.
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub location: String,
    /// Publish instant as epoch milliseconds. `None` when the site did not
    /// expose one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<u64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub seller: String,
    #[serde(default)]
    pub category: String,
    /// The query that produced this item.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub site: String,
}

impl Item {
    /// Age in whole minutes at `now_ms`. Items without a known publish time
    /// report 0 so they always pass the age filter.
    pub fn age_minutes(&self, now_ms: u64) -> u64 {
        match self.publish_time {
            Some(ts) => now_ms.saturating_sub(ts) / 60_000,
            None => 0,
        }
    }

    /// Price rendered for chat captions ("123" or "123.50").
    pub fn price_display(&self) -> String {
        if (self.price - self.price.trunc()).abs() < f64::EPSILON {
            format!("{:.0}", self.price)
        } else {
            format!("{:.2}", self.price)
        }
    }
}

/// Keep only items no older than `max_age_min` minutes at `now_ms`.
///
/// Preserves input order.
pub fn filter_by_age(items: Vec<Item>, max_age_min: u64, now_ms: u64) -> Vec<Item> {
    items.into_iter().filter(|item| item.age_minutes(now_ms) <= max_age_min).collect()
}

/// Return current epoch millis.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
