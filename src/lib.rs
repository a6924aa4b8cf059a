//! QR Check-in Token Provider
//!
//! Keeps a short-lived check-in token warm behind a small HTTP API. Tokens are
//! issued by an upstream endpoint for an authenticated account session; when the
//! session stops working, a headless Chromium logs in again and its cookies
//! become the new session.
//!
//! # Architecture
//!
//! - [`session::TokenManager`]: the token cache. Serves the current token until
//!   its freshness window ends, then refreshes it with at most one acquisition
//!   in flight.
//! - [`session::SessionPipeline`]: cheap acquisition with the session cookies,
//!   escalated acquisition through a browser login.
//! - [`browser`]: the Chromium engine behind the login, driven over DevTools.
//! - [`render`]: QR code PNG rendering, memoized per size for the current token.
//! - [`server`]: the axum HTTP API.
//!
//! # Usage
//!
//! ## HTTP Server Mode
//!
//! ```bash
//! qr-checkin --config config.toml --bind 127.0.0.1:8080
//! curl -H "X-API-KEY: $KEY" "http://127.0.0.1:8080/?type=png&size=256" -o qr.png
//! ```
//!
//! ## One-shot Mode
//!
//! ```bash
//! qr-checkin-generate --config config.toml
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use qr_checkin_provider::{Settings, TokenManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Arc::new(Settings::default());
//! let manager = TokenManager::from_settings(settings).await?;
//! println!("{}", manager.get_token().await?);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod render;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{Error, Result};
pub use session::{SessionPipeline, TokenManager};
pub use types::{ErrorResponse, PingResponse, TokenQuery};
