// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn sign_is_deterministic() {
    let a = sign("seed", 1_700_000_000_000, "34839810", r#"{"keyword":"bike"}"#);
    let b = sign("seed", 1_700_000_000_000, "34839810", r#"{"keyword":"bike"}"#);
    assert_eq!(a, b);
}

#[test]
fn sign_is_lowercase_hex_of_fixed_width() {
    let s = sign("seed", 1, "key", "{}");
    assert_eq!(s.len(), 64);
    assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[yare::parameterized(
    seed = { "other", 1_700_000_000_000, "34839810", r#"{"keyword":"bike"}"# },
    timestamp = { "seed", 1_700_000_000_001, "34839810", r#"{"keyword":"bike"}"# },
    app_key = { "seed", 1_700_000_000_000, "12345678", r#"{"keyword":"bike"}"# },
    body = { "seed", 1_700_000_000_000, "34839810", r#"{"keyword":"phone"}"# },
)]
fn any_input_change_changes_the_sign(seed: &str, ts: u64, app_key: &str, body: &str) {
    let baseline = sign("seed", 1_700_000_000_000, "34839810", r#"{"keyword":"bike"}"#);
    assert_ne!(sign(seed, ts, app_key, body), baseline);
}

#[test]
fn empty_seed_still_signs() {
    // A token without a seed produces a sign the server will reject — the
    // rejection is the reactive-refresh signal, not a local failure.
    let s = sign("", 1, "34839810", "{}");
    assert_eq!(s.len(), 64);
}
