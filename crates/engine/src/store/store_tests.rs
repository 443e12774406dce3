// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_paths_match_documented_names() {
    let layout = DataLayout::new(PathBuf::from("/data"));
    assert_eq!(layout.whitelist_file(), PathBuf::from("/data/whitelist.txt"));
    assert_eq!(layout.cookies_file(), PathBuf::from("/data/cookies.properties"));
    assert_eq!(
        layout.sent_products_file(42),
        PathBuf::from("/data/sent_products/user_42.txt")
    );
    assert_eq!(layout.user_settings_file(42), PathBuf::from("/data/user_settings/42.json"));
    assert_eq!(layout.user_products_file(42), PathBuf::from("/data/user_products/42.json"));
    assert_eq!(layout.backups_dir(), PathBuf::from("/data/backups"));
}

#[test]
fn atomic_write_creates_parents_and_replaces() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/deep/file.txt");
    atomic_write(&path, b"one")?;
    assert_eq!(std::fs::read_to_string(&path)?, "one");
    atomic_write(&path, b"two")?;
    assert_eq!(std::fs::read_to_string(&path)?, "two");
    // No tmp file left behind.
    assert!(!path.with_extension("tmp").exists());
    Ok(())
}
