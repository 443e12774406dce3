// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request signing for the h5 gateway.

use sha2::{Digest, Sha256};

/// Compute the `sign` query parameter.
///
/// Hex digest over `seed&timestamp&app_key&body`, where `seed` is the
/// precomputed token seed and `body` is the JSON-serialized request data.
pub fn sign(seed: &str, timestamp_ms: u64, app_key: &str, body: &str) -> String {
    let input = format!("{seed}&{timestamp_ms}&{app_key}&{body}");
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
#[path = "sign_tests.rs"]
mod tests;
