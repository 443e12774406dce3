// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn reads_domain_cookies_entry() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cookies.properties");
    std::fs::write(&path, "# persisted by the engine\ngoofish.cookies = _m_h5_tk=abc_1; cna=x\n")?;

    let provider = CookieFileProvider::new(path, "goofish");
    let cookies = provider.fetch().await?;
    assert_eq!(cookies.get("_m_h5_tk").map(String::as_str), Some("abc_1"));
    assert_eq!(cookies.len(), 2);
    Ok(())
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let provider = CookieFileProvider::new(PathBuf::from("/nonexistent/cookies.properties"), "goofish");
    assert!(provider.fetch().await.is_err());
}

#[tokio::test]
async fn missing_domain_entry_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cookies.properties");
    std::fs::write(&path, "other.cookies = a=1\n")?;
    let provider = CookieFileProvider::new(path, "goofish");
    assert!(provider.fetch().await.is_err());
    Ok(())
}

#[tokio::test]
async fn empty_jar_is_an_error() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("cookies.properties");
    std::fs::write(&path, "goofish.cookies = ;;\n")?;
    let provider = CookieFileProvider::new(path, "goofish");
    assert!(provider.fetch().await.is_err());
    Ok(())
}
