// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit store of item snapshots per user (`user_products/<id>.json`).

use tokio::sync::Mutex;

use crate::model::Item;
use crate::store::{atomic_write, DataLayout};

/// Keeps the most recent item snapshots per user for audit and resumption.
pub struct ItemStore {
    layout: DataLayout,
    max_per_user: usize,
    write_lock: Mutex<()>,
}

impl ItemStore {
    pub fn new(layout: DataLayout, max_per_user: usize) -> Self {
        Self { layout, max_per_user, write_lock: Mutex::new(()) }
    }

    pub fn load(&self, user_id: u64) -> Vec<Item> {
        let path = self.layout.user_products_file(user_id);
        match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Append snapshots, keeping only the newest `max_per_user`.
    pub async fn append(&self, user_id: u64, items: &[Item]) -> anyhow::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut all = self.load(user_id);
        all.extend(items.iter().cloned());
        if all.len() > self.max_per_user {
            let drop = all.len() - self.max_per_user;
            all.drain(..drop);
        }
        let path = self.layout.user_products_file(user_id);
        let json = serde_json::to_string(&all)?;
        atomic_write(&path, json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "items_tests.rs"]
mod tests;
