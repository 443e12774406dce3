// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification for marketplace responses.
//!
//! All string sniffing of upstream error phrases lives here; the polling
//! loop only ever sees tagged [`SearchError`] kinds.

use crate::adapter::SearchError;

/// Classify an mtop `ret` string (or raw body excerpt) into a [`SearchError`],
/// or `None` when it signals success.
///
/// Matching is case-insensitive against known mtop error codes and the
/// Chinese phrases the gateway uses for token and rate-limit failures.
pub fn classify_ret(ret: &str) -> Option<SearchError> {
    let lower = ret.to_lowercase();

    if lower.contains("success::") {
        return None;
    }

    // Token/session no longer accepted.
    if lower.contains("fail_sys_token_expired")
        || lower.contains("fail_sys_token_empty")
        || lower.contains("fail_sys_illegal_access")
        || lower.contains("fail_sys_session_expired")
        || ret.contains("令牌过期")
        || ret.contains("令牌为空")
    {
        return Some(SearchError::Auth(ret.to_owned()));
    }

    // Anti-crawler wall / rate limiting.
    if lower.contains("rgv587_error")
        || lower.contains("fail_sys_user_validate")
        || lower.contains("captcha")
        || lower.contains("punish")
        || ret.contains("被挤爆")
    {
        return Some(SearchError::Blocked(ret.to_owned()));
    }

    // Gateway hiccups worth retrying.
    if lower.contains("fail_sys_service_fault")
        || lower.contains("fail_sys_service_timeout")
        || lower.contains("fail_sys_traffic_limit")
    {
        return Some(SearchError::Transient(ret.to_owned()));
    }

    Some(SearchError::Other(ret.to_owned()))
}

/// Classify a non-success HTTP status.
pub fn classify_status(status: u16, body_excerpt: &str) -> SearchError {
    match status {
        401 => SearchError::Auth(format!("http 401: {body_excerpt}")),
        403 | 429 => SearchError::Blocked(format!("http {status}: {body_excerpt}")),
        500..=599 => SearchError::Transient(format!("http {status}: {body_excerpt}")),
        _ => SearchError::Other(format!("http {status}: {body_excerpt}")),
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
