// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent allow-list of user ids permitted to start loops.

use std::collections::BTreeSet;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::store::atomic_write;
use crate::store::backup::BackupManager;

/// User ids the supervisor will honor `start` for.
///
/// Backed by `whitelist.txt`, one decimal id per line. `#`-prefixed and
/// blank lines are ignored on load; every mutation persists before
/// returning success.
pub struct AllowList {
    path: PathBuf,
    ids: RwLock<BTreeSet<u64>>,
    backup: BackupManager,
}

impl AllowList {
    /// Load from disk. A missing file is an empty list.
    pub fn load(path: PathBuf, backup: BackupManager) -> anyhow::Result<Self> {
        let mut ids = BTreeSet::new();
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match line.parse::<u64>() {
                        Ok(id) => {
                            ids.insert(id);
                        }
                        Err(_) => {
                            tracing::warn!(%line, "skipping malformed allow-list entry");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => anyhow::bail!("read {}: {e}", path.display()),
        }
        tracing::debug!(count = ids.len(), "allow-list loaded");
        Ok(Self { path, ids: RwLock::new(ids), backup })
    }

    pub fn contains(&self, user_id: u64) -> bool {
        self.ids.read().contains(&user_id)
    }

    /// Add an id. Returns false if it was already present.
    pub fn add(&self, user_id: u64) -> anyhow::Result<bool> {
        {
            let mut ids = self.ids.write();
            if !ids.insert(user_id) {
                return Ok(false);
            }
        }
        self.persist()?;
        Ok(true)
    }

    /// Remove an id. Returns false if it was absent.
    pub fn remove(&self, user_id: u64) -> anyhow::Result<bool> {
        {
            let mut ids = self.ids.write();
            if !ids.remove(&user_id) {
                return Ok(false);
            }
        }
        self.persist()?;
        Ok(true)
    }

    pub fn list(&self) -> Vec<u64> {
        self.ids.read().iter().copied().collect()
    }

    fn persist(&self) -> anyhow::Result<()> {
        let contents: String =
            self.ids.read().iter().map(|id| format!("{id}\n")).collect();
        atomic_write(&self.path, contents.as_bytes())?;
        self.backup.backup_file(&self.path);
        Ok(())
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
