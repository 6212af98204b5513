//! Configuration for the relay.
//!
//! Everything the render pipeline needs from the outside world is carried in
//! [`RelayConfig`], built via its [`RelayConfigBuilder`]. The cache directory
//! in particular is an explicit value handed to the cache at construction
//! time; nothing in the library reads process-wide state after startup.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the subdirectory created under the platform cache directory.
pub const CACHE_SUBDIR: &str = "unmedium";

/// Path the composed page links its stylesheet from.
pub const DEFAULT_STYLESHEET_HREF: &str = "/resources/base.css";

/// Configuration for fetching, caching and rendering articles.
///
/// # Example
/// ```rust
/// use unmedium::RelayConfig;
///
/// let config = RelayConfig::builder()
///     .cache_dir("/tmp/unmedium-cache")
///     .poll_interval_ms(250)
///     .max_poll_attempts(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_poll_attempts, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Flat directory holding one file per cached article. Default:
    /// [`default_cache_dir()`].
    pub cache_dir: PathBuf,

    /// Delay between page loads while waiting for the article region.
    /// Range: 50–5000 ms. Default: 500.
    pub poll_interval_ms: u64,

    /// Page loads attempted before giving up with
    /// [`RelayError::FetchTimeout`]. Default: 20.
    pub max_poll_attempts: u32,

    /// Timeout for a single page load in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// `User-Agent` header sent with every page load.
    pub user_agent: String,

    /// Stylesheet link written into every composed page.
    pub stylesheet_href: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            poll_interval_ms: 500,
            max_poll_attempts: 20,
            fetch_timeout_secs: 30,
            user_agent: concat!("unmedium/", env!("CARGO_PKG_VERSION")).to_string(),
            stylesheet_href: DEFAULT_STYLESHEET_HREF.to_string(),
        }
    }
}

impl RelayConfig {
    /// Create a new builder for `RelayConfig`.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Builder for [`RelayConfig`].
#[derive(Debug)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.clamp(50, 5000);
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn stylesheet_href(mut self, href: impl Into<String>) -> Self {
        self.config.stylesheet_href = href.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RelayConfig, RelayError> {
        let c = &self.config;
        if c.max_poll_attempts == 0 {
            return Err(RelayError::InvalidConfig(
                "max_poll_attempts must be ≥ 1".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(RelayError::InvalidConfig(
                "fetch_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.cache_dir.as_os_str().is_empty() {
            return Err(RelayError::InvalidConfig("cache_dir must not be empty".into()));
        }
        Ok(self.config)
    }
}

/// Per-user cache location for article files.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/unmedium/`
/// - **Linux**: `~/.cache/unmedium/`
/// - **Windows**: `%LOCALAPPDATA%\unmedium\`
pub fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join(CACHE_SUBDIR)
}
