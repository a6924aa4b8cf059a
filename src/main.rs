//! HTTP server binary for the QR check-in token provider
//!
//! Keeps the check-in token warm and serves it as text or as a QR code PNG.
//!
//! # Usage
//!
//! ```bash
//! qr-checkin --config config.toml --bind 127.0.0.1:8080
//! qr-checkin --bind /run/qr-checkin.sock
//! ```
//!
//! # API Endpoints
//!
//! - `GET /?type=txt|png&size=N`: Current token (requires `X-API-KEY`)
//! - `GET /ping`: Health check endpoint
//! - `POST /invalidate`: Force a refresh on the next request

use clap::Parser;
use qr_checkin_provider::cli::{ServerArgs, run_server_mode};
use std::path::PathBuf;

/// HTTP server for QR check-in tokens
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "qr-checkin")]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to config.toml or config.json
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Listen address: host:port, or a Unix socket path
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    run_server_mode(ServerArgs {
        config: cli.config,
        bind: cli.bind,
        verbose: cli.verbose,
    })
    .await
}
