// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort compressed backups of mutated state files.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::model::epoch_ms;

/// Number of backups retained per source file.
const RETAIN_PER_SOURCE: usize = 10;

/// Writes gzip snapshots of state files into `backups/`.
///
/// Every operation is best-effort: failures are logged and swallowed so a
/// full disk never takes down the engine.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    enabled: bool,
}

impl BackupManager {
    pub fn new(dir: PathBuf, enabled: bool) -> Self {
        Self { dir, enabled }
    }

    /// Disabled manager for tests and minimal deployments.
    pub fn disabled() -> Self {
        Self { dir: PathBuf::new(), enabled: false }
    }

    /// Snapshot `source` as `backups/<name>.<epoch-ms>.gz`, pruning old copies.
    pub fn backup_file(&self, source: &Path) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.try_backup(source) {
            tracing::warn!(source = %source.display(), err = %e, "backup failed");
        }
    }

    fn try_backup(&self, source: &Path) -> anyhow::Result<()> {
        let contents = std::fs::read(source)?;
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow::anyhow!("unnamed source {}", source.display()))?;
        std::fs::create_dir_all(&self.dir)?;

        let dest = self.dir.join(format!("{name}.{}.gz", epoch_ms()));
        let file = std::fs::File::create(&dest)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&contents)?;
        encoder.finish()?;

        self.prune(name)?;
        Ok(())
    }

    /// Keep only the newest [`RETAIN_PER_SOURCE`] backups for `name`.
    fn prune(&self, name: &str) -> anyhow::Result<()> {
        let prefix = format!("{name}.");
        let mut backups: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".gz"))
            })
            .collect();
        // Timestamped names sort chronologically for equal-width epochs;
        // sort by file name descending and drop the tail.
        backups.sort();
        backups.reverse();
        for stale in backups.iter().skip(RETAIN_PER_SOURCE) {
            if let Err(e) = std::fs::remove_file(stale) {
                tracing::debug!(path = %stale.display(), err = %e, "prune failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
