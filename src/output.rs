//! Result type of a render.

use crate::error::RenderWarning;
use serde::{Deserialize, Serialize};

/// A rendered article page plus what happened on the way.
///
/// `html` is always a complete document. `warnings` lists best-effort steps
/// that did not succeed (cache write, noscript recovery); none of them
/// affect whether the page can be served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOutput {
    /// Source URL as requested.
    pub url: String,
    /// File name of the cache entry for this URL.
    pub cache_key: String,
    /// The composed page.
    pub html: String,
    /// Whether the page came from the disk cache.
    pub cache_hit: bool,
    /// Non-fatal problems, in the order they occurred.
    pub warnings: Vec<RenderWarning>,
    /// Wall-clock time of the whole render.
    pub duration_ms: u64,
}

impl RenderOutput {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
