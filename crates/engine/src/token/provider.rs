// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token provider abstraction over whatever produces fresh cookies.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::config::Properties;
use crate::token::parse_cookie_str;

/// Source of fresh cookie jars.
///
/// The production provider drives a headless browser session; tests and
/// static-cookie deployments use [`CookieFileProvider`]. Object-safe for use
/// as `Box<dyn TokenProvider>`.
pub trait TokenProvider: Send + Sync + 'static {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BTreeMap<String, String>>> + Send + '_>>;
}

/// Provider that re-reads a `cookies.properties` file.
///
/// Used when `cookie.dynamic.enabled=false`, and as the startup seed even in
/// dynamic mode: whatever the last process persisted is the first token.
pub struct CookieFileProvider {
    path: PathBuf,
    domain: String,
}

impl CookieFileProvider {
    pub fn new(path: PathBuf, domain: impl Into<String>) -> Self {
        Self { path, domain: domain.into() }
    }

    fn read_cookies(&self) -> anyhow::Result<BTreeMap<String, String>> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| anyhow::anyhow!("read {}: {e}", self.path.display()))?;
        let props = Properties::parse(&contents);
        let key = format!("{}.cookies", self.domain);
        let raw = props
            .get_opt(&key)
            .ok_or_else(|| anyhow::anyhow!("no `{key}` entry in {}", self.path.display()))?;
        let cookies = parse_cookie_str(raw);
        if cookies.is_empty() {
            anyhow::bail!("`{key}` entry parsed to an empty cookie jar");
        }
        Ok(cookies)
    }
}

impl TokenProvider for CookieFileProvider {
    fn fetch(
        &self,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<BTreeMap<String, String>>> + Send + '_>> {
        Box::pin(async move { self.read_cookies() })
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
