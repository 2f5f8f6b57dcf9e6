//! # Stockroom Console
//!
//! Terminal front end for the inventory dashboard. Reads one command per
//! line and drives the same client state a graphical dashboard would.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. Initialize Logging (stderr, RUST_LOG overrides the default filter) │
//! │  2. Load Configuration (file → STOCKROOM_* env → command line)         │
//! │  3. Build Dashboard (HTTP transport, state file storage)               │
//! │  4. Read Boot Hints (theme, last user; nobody is signed in yet)        │
//! │  5. Run the Shell until `quit` or end of input                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod shell;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom_client::{ClientConfig, Dashboard};

/// Stockroom inventory dashboard.
#[derive(Parser, Debug)]
#[command(name = "stockroom", version, about = "Stockroom inventory dashboard")]
struct Cli {
    /// Path to the config file (default: platform config directory).
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// API base URL, overriding the config file.
    #[arg(long = "api-url")]
    api_url: Option<String>,

    /// Rows per page for new listings.
    #[arg(long = "page-size")]
    page_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = ClientConfig::read(cli.config).context("loading configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(size) = cli.page_size {
        config.listing.default_page_size = size;
    }
    config.validate().context("invalid configuration")?;
    info!(base_url = %config.api.base_url, "Configuration loaded");

    let dashboard = Dashboard::new(config).context("starting dashboard")?;
    let hints = dashboard.session().restore().context("reading saved state")?;

    let mut shell = shell::Shell::new(dashboard)?;
    shell.greet(&hints);
    shell.run().await
}

/// Logs go to stderr so they never interleave with command output.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockroom_client=trace` - Trace the client crate only
/// - Default: INFO, DEBUG for stockroom crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,reqwest=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
