//! Render pipeline: cache lookup, fetch on miss, cleanup, composition.
//!
//! ```text
//! url ──▶ sanitize ──▶ cache.lookup ──┬─ hit ──────────────────────┐
//!                                     └─ miss ─▶ fetch ─▶ store ───┴─▶ transform ─▶ compose
//! ```
//!
//! The cache holds the pristine page, so cleanup runs on every serve. All
//! I/O happens before the document is parsed; the DOM is built, transformed
//! and serialised inside [`render_markup`] without crossing an await point.

use crate::config::RelayConfig;
use crate::error::{RelayError, RenderWarning};
use crate::output::RenderOutput;
use crate::pipeline::cache::{CacheLookup, DiskCache};
use crate::pipeline::compose::compose_page;
use crate::pipeline::document::{find_article, parse_document};
use crate::pipeline::fetch::{HttpFetcher, PageSource};
use crate::pipeline::sanitize::{sanitize, CacheKey};
use crate::pipeline::transform::transform_article;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The reader-mode relay: one cache, one page source, one configuration.
///
/// Cheap to share behind an `Arc`; holds no mutable state.
pub struct Relay {
    config: RelayConfig,
    cache: DiskCache,
    source: Arc<dyn PageSource>,
}

impl Relay {
    /// Build a relay that loads pages over HTTP.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_source(config, Arc::new(fetcher)))
    }

    /// Build a relay around any [`PageSource`].
    pub fn with_source(config: RelayConfig, source: Arc<dyn PageSource>) -> Self {
        let cache = DiskCache::new(config.cache_dir.clone());
        Self {
            config,
            cache,
            source,
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    /// Render the article at `url`.
    ///
    /// # Errors
    /// Returns `Err(RelayError)` only when the page has to be fetched and the
    /// fetch fails. Cache problems are recorded in
    /// [`RenderOutput::warnings`] and never fail the render.
    pub async fn render(&self, url: &str) -> Result<RenderOutput, RelayError> {
        let start = Instant::now();
        let key = sanitize(url);
        let mut warnings = Vec::new();

        // ── Step 1: Cache lookup, fetch on miss ──────────────────────────────
        let (raw, cache_hit) = self.load_page(url, &key, &mut warnings).await?;

        // ── Step 2: Transform and compose ────────────────────────────────────
        let (html, render_warnings) = render_markup(&raw, &self.config.stylesheet_href);
        warnings.extend(render_warnings);

        let duration_ms = whole_millis(start.elapsed());
        info!(
            "Rendered {} ({}, {} bytes, {}ms)",
            url,
            if cache_hit { "cache hit" } else { "fetched" },
            html.len(),
            duration_ms
        );

        Ok(RenderOutput {
            url: url.to_string(),
            cache_key: key.to_string(),
            html,
            cache_hit,
            warnings,
            duration_ms,
        })
    }

    /// Render `url` and write the page to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn render_to_file(
        &self,
        url: &str,
        output_path: &Path,
    ) -> Result<RenderOutput, RelayError> {
        let output = self.render(url).await?;

        let tmp_path = output_path.with_extension("html.tmp");
        let write_err =
            |e: std::io::Error| RelayError::Internal(format!("Failed to write '{}': {e}", output_path.display()));
        tokio::fs::write(&tmp_path, &output.html).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp_path, output_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }

        info!("Wrote {}", output_path.display());
        Ok(output)
    }

    /// Raw page bytes for `url`, from the cache or a fresh fetch.
    async fn load_page(
        &self,
        url: &str,
        key: &CacheKey,
        warnings: &mut Vec<RenderWarning>,
    ) -> Result<(Vec<u8>, bool), RelayError> {
        let mut cache_readable = true;

        match self.cache.lookup(key).await {
            Ok(CacheLookup::Hit(bytes)) => {
                info!("Cache hit for {}", url);
                return Ok((bytes, true));
            }
            Ok(CacheLookup::Miss) => debug!("Cache miss for {}", url),
            Err(e) => {
                // Refetch, but leave the broken entry for the operator to see.
                warn!("Unreadable cache entry for {}: {}", url, e);
                warnings.push(RenderWarning::CacheReadFailed {
                    key: key.to_string(),
                    detail: e.to_string(),
                });
                cache_readable = false;
            }
        }

        let page = self.source.fetch(url).await?;

        if cache_readable {
            info!("Caching {}", url);
            if let Err(e) = self.cache.store(key, &page.body).await {
                warn!("Error caching {}: {}", url, e);
                warnings.push(RenderWarning::CacheWriteFailed {
                    key: key.to_string(),
                    detail: e.to_string(),
                });
            }
        }

        Ok((page.body, false))
    }
}

/// Render the article at `url` with a one-off HTTP relay.
///
/// Convenience for scripts and the CLI's single-page mode; a server should
/// build one [`Relay`] and share it.
pub async fn render(url: impl AsRef<str>, config: &RelayConfig) -> Result<RenderOutput, RelayError> {
    let relay = Relay::new(config.clone())?;
    relay.render(url.as_ref()).await
}

/// Render `url` with a one-off HTTP relay and write the page to `output_path`.
pub async fn render_to_file(
    url: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &RelayConfig,
) -> Result<RenderOutput, RelayError> {
    let relay = Relay::new(config.clone())?;
    relay.render_to_file(url.as_ref(), output_path.as_ref()).await
}

/// `d` in whole milliseconds, saturating at `u64::MAX`.
fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Parse raw page bytes, clean the article and compose the final page.
///
/// Pure and deterministic: the same bytes always give the same page. A
/// document without an `<article>` yields a page with an empty body and a
/// [`RenderWarning::ArticleMissing`].
pub fn render_markup(raw: &[u8], stylesheet_href: &str) -> (String, Vec<RenderWarning>) {
    let document = parse_document(raw);
    let article = find_article(&document);

    let warnings = match &article {
        Some(article) => transform_article(article),
        None => {
            warn!("Document has no <article> region");
            vec![RenderWarning::ArticleMissing]
        }
    };

    let html = compose_page(&document, article.as_ref(), stylesheet_href);
    (html, warnings)
}
