// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Read;

use super::*;

fn gz_decode(path: &Path) -> anyhow::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut decoder = flate2::read::GzDecoder::new(file);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[test]
fn backup_writes_gzip_copy() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("whitelist.txt");
    std::fs::write(&source, "42\n43\n")?;

    let manager = BackupManager::new(dir.path().join("backups"), true);
    manager.backup_file(&source);

    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backups"))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(gz_decode(&backups[0])?, b"42\n43\n");
    Ok(())
}

#[test]
fn disabled_manager_writes_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let source = dir.path().join("whitelist.txt");
    std::fs::write(&source, "42\n")?;

    let backups_dir = dir.path().join("backups");
    let manager = BackupManager::new(backups_dir.clone(), false);
    manager.backup_file(&source);
    assert!(!backups_dir.exists());
    Ok(())
}

#[test]
fn missing_source_is_swallowed() {
    let manager = BackupManager::new(PathBuf::from("/nonexistent/backups"), true);
    // Must not panic or error out.
    manager.backup_file(Path::new("/nonexistent/source.txt"));
}

#[test]
fn prune_retains_newest_ten() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let backups_dir = dir.path().join("backups");
    std::fs::create_dir_all(&backups_dir)?;
    // Seed 12 fake timestamped backups with equal-width epochs.
    for n in 0..12u64 {
        std::fs::write(
            backups_dir.join(format!("whitelist.txt.{}.gz", 1_700_000_000_000 + n)),
            b"x",
        )?;
    }
    let source = dir.path().join("whitelist.txt");
    std::fs::write(&source, "42\n")?;

    let manager = BackupManager::new(backups_dir.clone(), true);
    manager.backup_file(&source);

    let count = std::fs::read_dir(&backups_dir)?.count();
    assert_eq!(count, 10);
    Ok(())
}
