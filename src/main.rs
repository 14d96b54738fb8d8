//! Canopy - lazy-loading hierarchy browser for image repositories
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use canopy::HeadlessOptions;
use canopy_core::{BrowserKind, DisplayMode};
use canopy_store::{Fixture, FixtureStore};
use clap::Parser;
use color_eyre::eyre::WrapErr;

/// Canopy - drive hierarchy browsers over stdin, events as NDJSON on stdout
#[derive(Parser, Debug)]
#[command(name = "canopy")]
#[command(about = "Lazy-loading hierarchy browser for image repositories", long_about = None)]
struct Args {
    /// JSON fixture answering store requests. Empty store when omitted.
    #[arg(long, value_name = "FILE")]
    fixture: Option<PathBuf>,

    /// Directory holding `.canopy/config.toml`
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Open a browser at startup (repeatable)
    #[arg(long = "open", value_name = "KIND")]
    open: Vec<BrowserKind>,

    /// Override the configured display mode
    #[arg(long, value_name = "MODE")]
    display_mode: Option<DisplayMode>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    canopy_core::logging::init()?;

    let config_dir = args
        .config_dir
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let store = match &args.fixture {
        Some(path) => FixtureStore::load(path)
            .wrap_err_with(|| format!("Failed to load fixture {}", path.display()))?,
        None => FixtureStore::from_fixture(Fixture::default()),
    };

    let options = HeadlessOptions {
        fixture: args.fixture.map(|p| p.display().to_string()),
        display_mode: args.display_mode,
        open: args.open,
    };

    canopy::run_headless(config_dir, store, options).await?;
    Ok(())
}
