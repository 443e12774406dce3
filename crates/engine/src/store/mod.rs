// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent state: file layout and write primitives.

pub mod allowlist;
pub mod backup;
pub mod history;
pub mod items;
pub mod settings;

use std::path::{Path, PathBuf};

/// File layout under `storage.data.dir`.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn whitelist_file(&self) -> PathBuf {
        self.root.join("whitelist.txt")
    }

    pub fn cookies_file(&self) -> PathBuf {
        self.root.join("cookies.properties")
    }

    pub fn sent_products_file(&self, user_id: u64) -> PathBuf {
        self.root.join("sent_products").join(format!("user_{user_id}.txt"))
    }

    pub fn user_settings_file(&self, user_id: u64) -> PathBuf {
        self.root.join("user_settings").join(format!("{user_id}.json"))
    }

    pub fn user_products_file(&self, user_id: u64) -> PathBuf {
        self.root.join("user_products").join(format!("{user_id}.json"))
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

/// Write a file atomically (write tmp + rename).
pub fn atomic_write(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, contents)
        .map_err(|e| anyhow::anyhow!("write {}: {e}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .map_err(|e| anyhow::anyhow!("rename into {}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
