//! CLI binary for unmedium.
//!
//! A thin shim over the library crate: maps CLI flags to `RelayConfig`,
//! then either serves the relay over HTTP or renders a single article.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use unmedium::{serve, Relay, RelayConfig, RenderOutput};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on :8080, caching into the platform cache directory
  unmedium

  # Then open an article through the relay
  http://localhost:8080/https://medium.com/@someone/some-post-1234

  # Serve elsewhere with a custom cache
  unmedium --addr 127.0.0.1:9000 --cache-dir /var/cache/unmedium

  # Render one article to a file and exit
  unmedium --render https://medium.com/@someone/some-post-1234 -o post.html

  # Inspect what happened (cache hit, warnings) as JSON
  unmedium --render https://medium.com/@someone/some-post-1234 --json

CACHE:
  One file per article, named after the sanitized URL, holding the page
  exactly as fetched. Entries never expire; delete files to refetch.
"#;

/// Reader-mode relay for article pages.
#[derive(Parser, Debug)]
#[command(
    name = "unmedium",
    version,
    about = "Reader-mode relay: fetch, clean, cache and re-serve article pages",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "UNMEDIUM_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Cache directory (default: platform cache dir + /unmedium).
    #[arg(long, env = "UNMEDIUM_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Delay between page loads while waiting for the article, in ms (50–5000).
    #[arg(long, env = "UNMEDIUM_POLL_INTERVAL_MS", default_value_t = 500)]
    poll_interval_ms: u64,

    /// Page loads before giving up on an article that never appears.
    #[arg(long, env = "UNMEDIUM_MAX_POLL_ATTEMPTS", default_value_t = 20,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_poll_attempts: u32,

    /// Timeout for a single page load in seconds.
    #[arg(long, env = "UNMEDIUM_FETCH_TIMEOUT", default_value_t = 30)]
    fetch_timeout: u64,

    /// Render this article once and exit instead of serving.
    #[arg(long, value_name = "URL")]
    render: Option<String>,

    /// With --render: write the page to this file instead of stdout.
    #[arg(short, long, requires = "render")]
    output: Option<PathBuf>,

    /// With --render: print the full RenderOutput as JSON.
    #[arg(long, requires = "render")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "UNMEDIUM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "UNMEDIUM_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build relay ──────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let relay = Relay::new(config).context("Failed to initialise relay")?;

    // A missing cache directory only costs us caching, never serving.
    match relay.cache().ensure_dir().await {
        Ok(()) => info!("Caching into {}", relay.cache().dir().display()),
        Err(e) => warn!("{}", e),
    }

    // ── Single-article mode ──────────────────────────────────────────────
    if let Some(ref url) = cli.render {
        return render_once(&cli, &relay, url).await;
    }

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(cli.addr)
        .await
        .with_context(|| format!("Failed to bind {}", cli.addr))?;
    serve(listener, Arc::new(relay))
        .await
        .context("HTTP server failed")?;

    Ok(())
}

async fn render_once(cli: &Cli, relay: &Relay, url: &str) -> Result<()> {
    let spinner = if cli.quiet || cli.json {
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Rendering");
        bar.set_message(url.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    };

    let result = match cli.output {
        Some(ref path) => relay.render_to_file(url, path).await,
        None => relay.render(url).await,
    };
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Render failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.output.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet && !cli.json {
        print_summary(&output, cli.output.as_ref());
    }

    Ok(())
}

fn print_summary(output: &RenderOutput, path: Option<&PathBuf>) {
    eprintln!(
        "{}  {}  {} bytes  {}ms{}",
        if output.has_warnings() {
            cyan("⚠")
        } else {
            green("✔")
        },
        if output.cache_hit { "cache hit" } else { "fetched" },
        output.html.len(),
        output.duration_ms,
        path.map(|p| format!("  →  {}", p.display())).unwrap_or_default(),
    );
    for warning in &output.warnings {
        eprintln!("   {}", dim(&warning.to_string()));
    }
}

/// Map CLI args to `RelayConfig`.
fn build_config(cli: &Cli) -> Result<RelayConfig> {
    let mut builder = RelayConfig::builder()
        .poll_interval_ms(cli.poll_interval_ms)
        .max_poll_attempts(cli.max_poll_attempts)
        .fetch_timeout_secs(cli.fetch_timeout);

    if let Some(ref dir) = cli.cache_dir {
        builder = builder.cache_dir(dir);
    }

    builder.build().context("Invalid configuration")
}
