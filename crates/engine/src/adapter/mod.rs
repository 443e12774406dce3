// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Site adapters: request construction, signing, response parsing, and
//! error classification for one marketplace each.

pub mod classify;
pub mod goofish;
pub mod sign;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::model::Item;
use crate::token::SessionToken;

/// Classification of a failed search, driving the loop's reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The site rejected the current session token. The loop refreshes the
    /// token and retries; the adapter itself never refreshes.
    Auth(String),
    /// 403/429/captcha — stop polling this query for a while.
    Blocked(String),
    /// Network failure, 5xx, or malformed-but-non-auth payload.
    Transient(String),
    /// Well-formed response with zero items; terminates the page walk.
    EmptyPage,
    Other(String),
}

impl SearchError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Blocked(_) => "blocked",
            Self::Transient(_) => "transient",
            Self::EmptyPage => "empty-page",
            Self::Other(_) => "other",
        }
    }
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth(detail) => write!(f, "auth error: {detail}"),
            Self::Blocked(detail) => write!(f, "blocked: {detail}"),
            Self::Transient(detail) => write!(f, "transient: {detail}"),
            Self::EmptyPage => f.write_str("empty page"),
            Self::Other(detail) => write!(f, "search error: {detail}"),
        }
    }
}

impl std::error::Error for SearchError {}

/// One marketplace's search capability.
///
/// Object-safe for use as `Arc<dyn SiteAdapter>`. Implementations sign and
/// send the request with the given token snapshot and surface classified
/// errors; token refresh is the caller's business.
pub trait SiteAdapter: Send + Sync + 'static {
    fn search<'a>(
        &'a self,
        query: &'a str,
        page: u64,
        rows: u64,
        token: &'a SessionToken,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, SearchError>> + Send + 'a>>;

    /// Pacing hint between requests to this site.
    fn request_delay(&self) -> Duration;

    fn site(&self) -> &str;
}
