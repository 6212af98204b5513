//! # unmedium
//!
//! A personal reader-mode relay: request `/<article URL>` and get back just
//! the article (title, author, body text and images) in a minimal HTML page
//! with no scripts or layout scaffolding.
//!
//! ## Pipeline Overview
//!
//! ```text
//! GET /https://example.com/article-x
//!  │
//!  ├─ 1. Key      sanitize the URL into a file name
//!  ├─ 2. Cache    read the pristine page from disk …
//!  ├─ 3. Fetch    … or load it, polling until <article> exists, and store it
//!  ├─ 4. Clean    strip meta header, class/id, recover noscript images,
//!  │              lazy-load images, unwrap sections
//!  └─ 5. Compose  charset, title, stylesheet, author, article body
//! ```
//!
//! The cache keeps the page exactly as fetched, so cleanup rules can change
//! without invalidating anything.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use unmedium::{Relay, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = Relay::new(RelayConfig::default())?;
//!     let output = relay.render("https://example.com/article-x").await?;
//!     println!("{}", output.html);
//!     eprintln!("cache hit: {}, warnings: {}", output.cache_hit, output.warnings.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `unmedium` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod relay;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{default_cache_dir, RelayConfig, RelayConfigBuilder};
pub use error::{CacheError, RelayError, RenderWarning};
pub use output::RenderOutput;
pub use pipeline::cache::{CacheLookup, DiskCache};
pub use pipeline::fetch::{FetchedPage, HttpFetcher, PageSource};
pub use pipeline::sanitize::{sanitize, CacheKey};
pub use relay::{render, render_markup, render_to_file, Relay};
pub use server::{router, serve};
