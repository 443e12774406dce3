// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session tokens: cookie jar plus the derived signing seed.

pub mod manager;
pub mod provider;

use std::collections::BTreeMap;

use crate::model::epoch_ms;

/// Cookie whose value carries the signing seed.
pub const TOKEN_COOKIE: &str = "_m_h5_tk";

/// Immutable session token snapshot shared read-only with all workers.
///
/// The signing seed is derived once at install time so callers never
/// re-split cookie values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub cookies: BTreeMap<String, String>,
    /// Left part of the `_m_h5_tk` cookie value, split at the first `_`.
    /// Empty when the cookie is missing or malformed; the site will reject
    /// such requests with an auth error, which is the reactive-refresh signal.
    pub token_seed: String,
    /// Install instant, epoch ms. 0 for the never-initialized sentinel.
    pub obtained_at: u64,
}

impl SessionToken {
    /// Build a token from a cookie jar, deriving the signing seed.
    pub fn from_cookies(cookies: BTreeMap<String, String>) -> Self {
        let token_seed = cookies
            .get(TOKEN_COOKIE)
            .and_then(|v| v.split('_').next())
            .unwrap_or_default()
            .to_owned();
        Self { cookies, token_seed, obtained_at: epoch_ms() }
    }

    /// Sentinel for "no token has ever been installed".
    pub fn never() -> Self {
        Self { cookies: BTreeMap::new(), token_seed: String::new(), obtained_at: 0 }
    }

    pub fn is_initialized(&self) -> bool {
        self.obtained_at > 0 && !self.cookies.is_empty()
    }

    /// Render the jar as a `Cookie:` header value.
    pub fn cookie_header(&self) -> String {
        let pairs: Vec<String> =
            self.cookies.iter().map(|(name, value)| format!("{name}={value}")).collect();
        pairs.join("; ")
    }
}

/// Parse an RFC-style `name=value; name2=value2` cookie string.
///
/// Entries without `=` are skipped; later duplicates win.
pub fn parse_cookie_str(raw: &str) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for part in raw.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((name, value)) = part.split_once('=') {
            cookies.insert(name.trim().to_owned(), value.trim().to_owned());
        }
    }
    cookies
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
