//! Pipeline stages for serving an article.
//!
//! Each submodule implements exactly one concern, so each is independently
//! testable and the fetch backend can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! sanitize ──▶ cache ──▶ fetch ──▶ transform ──▶ compose
//! (URL→key)   (disk)    (HTTP)    (DOM cleanup)  (HTML shell)
//! ```
//!
//! 1. [`sanitize`]  — derive a file-name-safe cache key from the source URL
//! 2. [`cache`]     — read-through disk cache of pristine page bytes
//! 3. [`fetch`]     — load the page, polling until the article region exists;
//!    the only stage with network I/O
//! 4. [`transform`] — ordered, deterministic cleanup of the article subtree
//! 5. [`compose`]   — minimal HTML document around the cleaned article
//!
//! [`document`] holds the parsing helpers the DOM stages share.

pub mod cache;
pub mod compose;
pub mod document;
pub mod fetch;
pub mod sanitize;
pub mod transform;
