//! One-shot token generation
//!
//! Runs a single acquisition through the same cache controller as the server
//! and prints the token, or writes it as a QR code PNG.
//!
//! # Usage
//!
//! ```bash
//! qr-checkin-generate --config config.toml
//! qr-checkin-generate --config config.toml --png qr.png --size 512
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use qr_checkin_provider::{cli::init_tracing, config::ConfigLoader, session::TokenManager};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "qr-checkin-generate")]
struct Cli {
    /// Configuration file (TOML or JSON); defaults to config.toml or config.json
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Write the token as a QR code PNG to this file instead of printing it
    #[arg(long, value_name = "PATH")]
    png: Option<PathBuf>,

    /// PNG edge length in pixels
    #[arg(short, long, value_name = "PIXELS")]
    size: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigLoader::new()
        .load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    settings.logging.verbose |= cli.verbose;
    init_tracing(&settings.logging);

    let size = cli.size.unwrap_or(settings.server.default_png_size);
    if size == 0 || size > settings.server.max_png_size {
        anyhow::bail!(
            "size {} is outside 1..={}",
            size,
            settings.server.max_png_size
        );
    }

    let manager = TokenManager::from_settings(Arc::new(settings))
        .await
        .context("Failed to initialize token pipeline")?;

    match cli.png {
        Some(path) => {
            let image = manager.get_rendered_image(size).await?;
            tokio::fs::write(&path, &image)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}px QR code to {}", size, path.display());
        }
        None => println!("{}", manager.get_token().await?),
    }

    Ok(())
}
