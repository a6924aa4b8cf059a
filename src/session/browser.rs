//! Browser capability used by the login escalation
//!
//! The acquisition pipeline only talks to these traits; the concrete engine
//! lives in [`crate::browser`] and tests substitute scripted fakes.

use async_trait::async_trait;
use tokio::time::Instant;

use crate::{Result, types::HarvestedCookie};

/// Starts a fresh, isolated browser for one login attempt
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Session type produced by this launcher
    type Session: BrowserSession;

    /// Launch a browser with an empty profile
    async fn launch(&self) -> Result<Self::Session>;
}

/// One browser page driven step by step.
///
/// Dropping the session tears the browser down.
#[async_trait]
pub trait BrowserSession: Send {
    /// Start observing network responses and clear all cookies
    async fn prepare(&mut self) -> Result<()>;

    /// Load `url` in the page
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until an element matching `selector` exists
    async fn wait_for_element(&mut self, selector: &str, deadline: Instant) -> Result<()>;

    /// Fill the input matching `selector` with `value`
    async fn set_form_field(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Click the element matching `selector`
    async fn click(&mut self, selector: &str) -> Result<()>;

    /// Wait until a network response matches `matcher`, or `deadline` passes
    async fn wait_for_signal(
        &mut self,
        matcher: &SignalMatcher,
        deadline: Instant,
    ) -> Result<SignalOutcome>;

    /// Collect every cookie the browser holds
    async fn harvest_cookies(&mut self) -> Result<Vec<HarvestedCookie>>;
}

/// Recognizes the network response that marks a completed login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMatcher {
    response_url: String,
}

impl SignalMatcher {
    /// Match responses for exactly `url`, ignoring ASCII case
    pub fn response_url(url: impl Into<String>) -> Self {
        Self {
            response_url: url.into(),
        }
    }

    /// Whether a response for `url` is the signal
    pub fn matches(&self, url: &str) -> bool {
        self.response_url.eq_ignore_ascii_case(url)
    }

    /// The URL this matcher waits for
    pub fn url(&self) -> &str {
        &self.response_url
    }
}

/// Result of waiting for the login signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Received,
    TimedOut,
}
