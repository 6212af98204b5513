//! Cache-key sanitisation: turn an arbitrary URL into a safe file name.
//!
//! The cache is a flat directory and the key doubles as the file name, so
//! the key must never contain a path separator, a control character or a
//! reserved name (`.`, `..`). Distinct URLs may collapse to the same key;
//! that is accepted.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;

/// Upper bound on key length in bytes, well below common `NAME_MAX` (255).
pub const MAX_KEY_LEN: usize = 200;

/// Hex characters of the SHA-256 digest used in fallback and overflow keys.
const HASH_PREFIX_LEN: usize = 16;

/// A file-name-safe cache key derived from a source URL.
///
/// Only [`sanitize`] constructs keys, so every `CacheKey` upholds the
/// file-name invariants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

static RE_JOINERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ &_=+:]").unwrap());
static RE_ILLEGAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9.\-]").unwrap());
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Derive the cache key for `url`.
///
/// Pure and deterministic. Steps:
/// 1. trim surrounding whitespace
/// 2. joining characters (` &_=+:`) become `-`
/// 3. everything outside `[A-Za-z0-9.-]` is dropped
/// 4. runs of `-` collapse to one
/// 5. leading `.` and `-` are stripped
/// 6. an empty result becomes `url-<hash>`
/// 7. an over-long result is truncated and suffixed with `-<hash>`
pub fn sanitize(url: &str) -> CacheKey {
    let s = url.trim();
    let s = RE_JOINERS.replace_all(s, "-");
    let s = RE_ILLEGAL.replace_all(&s, "");
    let s = RE_DASHES.replace_all(&s, "-");
    let s = s.trim_start_matches(['.', '-']);

    if s.is_empty() {
        return CacheKey(format!("url-{}", digest_prefix(url)));
    }

    if s.len() > MAX_KEY_LEN {
        // Only ASCII survives step 3, so byte slicing is on char boundaries.
        let keep = MAX_KEY_LEN - HASH_PREFIX_LEN - 1;
        return CacheKey(format!("{}-{}", &s[..keep], digest_prefix(url)));
    }

    CacheKey(s.to_string())
}

fn digest_prefix(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_PREFIX_LEN);
    hex
}
