//! Token acquisition and caching
//!
//! [`TokenManager`] serves the current token and decides when to refresh it.
//! [`SessionPipeline`] performs the refresh, either by re-using the session
//! cookies or by logging in again through a browser.

pub mod browser;
pub mod login;
pub mod manager;
pub mod pipeline;
pub mod upstream;

pub use browser::{BrowserLauncher, BrowserSession, SignalMatcher, SignalOutcome};
pub use login::LoginFlow;
pub use manager::TokenManager;
pub use pipeline::{SessionPipeline, SessionPipelineGeneric, TokenAcquirer};
pub use upstream::{ClientOptions, UpstreamSession};
