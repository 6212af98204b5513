//! Error types for the unmedium library.
//!
//! Three types reflect three distinct failure modes:
//!
//! * [`RelayError`] — **Fatal**: the article cannot be served at all (the
//!   source page failed to load, or never produced an article region).
//!   Returned as `Err(RelayError)` from [`crate::relay::Relay::render`] and
//!   mapped to a 500 response by the HTTP front door.
//!
//! * [`CacheError`] — an I/O failure inside the disk cache. The cache reports
//!   it faithfully; the render pipeline decides that it is not fatal.
//!
//! * [`RenderWarning`] — **Non-fatal**: something best-effort did not happen
//!   (a cache write failed, a `<noscript>` fallback could not be recovered).
//!   Stored inside [`crate::output::RenderOutput`] so callers can log it
//!   without failing the request.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the unmedium library.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The page could not be loaded (network failure or non-success status).
    #[error("failed to fetch '{url}': {reason}")]
    FetchFailed { url: String, reason: String },

    /// The page loaded but the article region never appeared.
    #[error("no article appeared at '{url}' after {attempts} page loads")]
    FetchTimeout { url: String, attempts: u32 },

    // ── Cache errors ──────────────────────────────────────────────────────
    /// The cache directory could not be created.
    #[error("cache directory '{path}' is unavailable: {source}")]
    CacheDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// I/O failures reported by [`crate::pipeline::cache::DiskCache`].
///
/// A missing entry is not an error; see
/// [`crate::pipeline::cache::CacheLookup::Miss`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The entry exists but could not be read.
    #[error("failed to read cache entry '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The entry could not be written.
    #[error("failed to write cache entry '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A non-fatal problem encountered while rendering one article.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    /// An existing cache entry could not be read; the page was refetched.
    #[error("cache entry '{key}' could not be read: {detail}")]
    CacheReadFailed { key: String, detail: String },

    /// The freshly fetched page could not be written to the cache.
    #[error("cache entry '{key}' could not be written: {detail}")]
    CacheWriteFailed { key: String, detail: String },

    /// A `<noscript>` image fallback was left in place.
    #[error("noscript fallback skipped: {reason}")]
    NoscriptSkipped { reason: String },

    /// The document has no `<article>` region; the body was left empty.
    #[error("document has no <article> region")]
    ArticleMissing,
}
