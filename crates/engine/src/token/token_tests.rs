// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn seed_is_left_of_first_underscore() {
    let cookies = parse_cookie_str("_m_h5_tk=c9b8a7f6e5_1700000000000; cna=abc");
    let token = SessionToken::from_cookies(cookies);
    assert_eq!(token.token_seed, "c9b8a7f6e5");
    assert!(token.is_initialized());
}

#[test]
fn missing_token_cookie_yields_empty_seed() {
    let token = SessionToken::from_cookies(parse_cookie_str("cna=abc; t=123"));
    assert_eq!(token.token_seed, "");
    // Still installed — the site decides whether it is usable.
    assert!(token.is_initialized());
}

#[test]
fn malformed_token_cookie_without_underscore_keeps_whole_value() {
    let token = SessionToken::from_cookies(parse_cookie_str("_m_h5_tk=noseparator"));
    assert_eq!(token.token_seed, "noseparator");
}

#[test]
fn never_sentinel_is_uninitialized() {
    let token = SessionToken::never();
    assert!(!token.is_initialized());
    assert_eq!(token.obtained_at, 0);
    assert_eq!(token.cookie_header(), "");
}

#[test]
fn cookie_header_joins_pairs() {
    let token = SessionToken::from_cookies(parse_cookie_str("b=2; a=1"));
    // BTreeMap ordering: deterministic header.
    assert_eq!(token.cookie_header(), "a=1; b=2");
}

#[yare::parameterized(
    simple = { "a=1; b=2", 2 },
    trailing_semicolon = { "a=1; b=2;", 2 },
    empty = { "", 0 },
    no_equals_skipped = { "a=1; garbage; b=2", 2 },
    value_with_underscores = { "_m_h5_tk=seed_ts", 1 },
)]
fn parse_counts(raw: &str, expected: usize) {
    assert_eq!(parse_cookie_str(raw).len(), expected);
}

#[test]
fn parse_keeps_last_duplicate() {
    let cookies = parse_cookie_str("a=1; a=2");
    assert_eq!(cookies.get("a").map(String::as_str), Some("2"));
}
