//! Error type definitions
//!
//! Defines the main error types used throughout the check-in token provider.

use std::fmt;
use thiserror::Error;

/// Main error type for the check-in token provider
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Token issuance endpoint answered with a failure status or could not be reached
    #[error("Upstream error: {message}")]
    TransientUpstream {
        /// HTTP status, when a response was received
        status: Option<u16>,
        message: String,
    },

    /// Token issuance endpoint answered 200 without a usable token
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Interactive login failed at one of its steps
    #[error("Login flow failed at {step}: {reason}")]
    LoginFlow { step: String, reason: String },

    /// Both the cheap and the escalated acquisition failed
    #[error("Token acquisition failed: {0}")]
    AcquisitionFailed(AcquisitionFailure),

    /// QR rendering errors
    #[error("Render error: {0}")]
    Render(String),

    /// Browser process or DevTools protocol errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Causes of a failed acquisition, one per mode.
///
/// Stored as messages so a failure can be handed to every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionFailure {
    /// Why the cheap (cookie re-use) attempt failed
    pub cheap: String,
    /// Why the escalated (full login) attempt failed
    pub escalated: String,
}

impl AcquisitionFailure {
    /// Combine the failures of both acquisition modes
    pub fn new(cheap: &Error, escalated: &Error) -> Self {
        Self {
            cheap: cheap.to_string(),
            escalated: escalated.to_string(),
        }
    }
}

impl fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cheap mode: {}; escalated mode: {}",
            self.cheap, self.escalated
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Create an upstream error for a non-success HTTP status
    pub fn upstream_status(status: u16, msg: impl Into<String>) -> Self {
        Self::TransientUpstream {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create an upstream error for a transport failure
    pub fn upstream_transport(msg: impl Into<String>) -> Self {
        Self::TransientUpstream {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create a login flow error for the given step
    pub fn login_flow(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoginFlow {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure came from the issuance endpoint and warrants a full login
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientUpstream { .. } | Self::MalformedResponse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test config error");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("= broken");
        assert!(toml_err.is_err());

        let err: Error = toml_err.unwrap_err().into();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_error_from_reqwest() {
        let reqwest_err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();

        let err: Error = reqwest_err.into();
        assert!(matches!(err, Error::Network(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_upstream_status_error() {
        let err = Error::upstream_status(401, "api/v1/qr returned 401 Unauthorized");
        assert!(matches!(
            err,
            Error::TransientUpstream {
                status: Some(401),
                ..
            }
        ));
        assert!(err.to_string().contains("401"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_malformed_response_is_transient() {
        let err = Error::malformed_response("qrData is empty");
        assert!(err.is_transient());
        assert!(err.to_string().contains("qrData is empty"));
    }

    #[test]
    fn test_login_flow_error() {
        let err = Error::login_flow("wait_for_signal", "timed out");
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Login flow failed at wait_for_signal: timed out"
        );
    }

    #[test]
    fn test_acquisition_failed_carries_both_causes() {
        let cheap = Error::upstream_status(401, "unauthorized");
        let escalated = Error::login_flow("navigate", "net::ERR_NAME_NOT_RESOLVED");
        let err = Error::AcquisitionFailed(AcquisitionFailure::new(&cheap, &escalated));

        let Error::AcquisitionFailed(failure) = &err else {
            panic!("expected AcquisitionFailed, got {err:?}");
        };
        assert_eq!(failure.cheap, "Upstream error: unauthorized");
        assert!(failure.escalated.contains("navigate"));
        assert!(err.to_string().starts_with("Token acquisition failed:"));
        assert!(!err.is_transient());
    }
}
