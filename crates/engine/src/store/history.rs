// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user history of already-notified item ids.
//!
//! Single source of truth for duplicate suppression. An id recorded here is
//! never notified to that user again (at-most-once delivery): callers must
//! `mark_sent` a batch durably *before* handing it to the notifier.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Write;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::store::{atomic_write, ensure_parent, DataLayout};

/// In-memory mirror of one user's `sent_products/user_<id>.txt`.
struct UserHistory {
    ids: HashSet<String>,
    /// Insertion order for FIFO eviction when capped.
    order: VecDeque<String>,
}

impl UserHistory {
    fn insert(&mut self, id: String) -> bool {
        if self.ids.insert(id.clone()) {
            self.order.push_back(id);
            true
        } else {
            false
        }
    }
}

/// Durable per-user set of delivered item ids.
pub struct HistoryStore {
    layout: DataLayout,
    max_entries: usize,
    /// Outer lock guards the map; the per-user lock serializes file writes.
    users: Mutex<HashMap<u64, Arc<Mutex<UserHistory>>>>,
}

impl HistoryStore {
    pub fn new(layout: DataLayout, max_entries: usize) -> Self {
        Self { layout, max_entries, users: Mutex::new(HashMap::new()) }
    }

    async fn user_handle(&self, user_id: u64) -> anyhow::Result<Arc<Mutex<UserHistory>>> {
        let mut users = self.users.lock().await;
        if let Some(handle) = users.get(&user_id) {
            return Ok(Arc::clone(handle));
        }
        let history = self.load(user_id)?;
        let handle = Arc::new(Mutex::new(history));
        users.insert(user_id, Arc::clone(&handle));
        Ok(handle)
    }

    fn load(&self, user_id: u64) -> anyhow::Result<UserHistory> {
        let path = self.layout.sent_products_file(user_id);
        let mut history = UserHistory { ids: HashSet::new(), order: VecDeque::new() };
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        history.insert(line.to_owned());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => anyhow::bail!("read {}: {e}", path.display()),
        }
        Ok(history)
    }

    /// Subset of `candidates` not yet delivered to the user, in input order,
    /// deduplicated.
    pub async fn filter_new(
        &self,
        user_id: u64,
        candidates: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let handle = self.user_handle(user_id).await?;
        let history = handle.lock().await;
        let mut seen_in_batch = HashSet::new();
        Ok(candidates
            .iter()
            .filter(|id| !history.ids.contains(*id) && seen_in_batch.insert((*id).clone()))
            .cloned()
            .collect())
    }

    /// Record `ids` as delivered. Idempotent; durable before return.
    pub async fn mark_sent(&self, user_id: u64, ids: &[String]) -> anyhow::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let handle = self.user_handle(user_id).await?;
        let mut history = handle.lock().await;

        let fresh: Vec<String> =
            ids.iter().filter(|id| !history.ids.contains(*id)).cloned().collect();
        if fresh.is_empty() {
            return Ok(());
        }
        for id in &fresh {
            history.insert(id.clone());
        }

        let path = self.layout.sent_products_file(user_id);
        if history.order.len() > self.max_entries {
            // Evict oldest and rewrite in one pass.
            while history.order.len() > self.max_entries {
                if let Some(evicted) = history.order.pop_front() {
                    history.ids.remove(&evicted);
                }
            }
            let mut contents = String::new();
            for id in &history.order {
                contents.push_str(id);
                contents.push('\n');
            }
            atomic_write(&path, contents.as_bytes())?;
        } else {
            ensure_parent(&path)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| anyhow::anyhow!("open {}: {e}", path.display()))?;
            let mut block = String::new();
            for id in &fresh {
                block.push_str(id);
                block.push('\n');
            }
            file.write_all(block.as_bytes())
                .map_err(|e| anyhow::anyhow!("append {}: {e}", path.display()))?;
            file.flush().map_err(|e| anyhow::anyhow!("flush {}: {e}", path.display()))?;
        }
        Ok(())
    }

    /// Drop the user's history file and cache.
    pub async fn clear(&self, user_id: u64) -> anyhow::Result<()> {
        let mut users = self.users.lock().await;
        users.remove(&user_id);
        let path = self.layout.sent_products_file(user_id);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => anyhow::bail!("remove {}: {e}", path.display()),
        }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
