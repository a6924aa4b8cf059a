//! Response type definitions
//!
//! Defines the bodies returned by the HTTP API and the issuance endpoint payload.

use serde::{Deserialize, Serialize};

/// Payload of the upstream token issuance endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueResponse {
    /// The issued check-in token
    #[serde(rename = "qrData", default)]
    pub qr_data: String,
}

/// Ping response for health checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Server version
    pub version: String,
}

impl PingResponse {
    /// Create a new ping response
    pub fn new(server_uptime: u64, version: impl Into<String>) -> Self {
        Self {
            server_uptime,
            version: version.into(),
        }
    }
}

/// Error response for API errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_response_field_name() {
        let body: IssueResponse =
            serde_json::from_str(r#"{"qrData":"ABC123","expireTime":1700000000}"#).unwrap();
        assert_eq!(body.qr_data, "ABC123");
    }

    #[test]
    fn test_issue_response_missing_field_is_empty() {
        let body: IssueResponse = serde_json::from_str("{}").unwrap();
        assert!(body.qr_data.is_empty());
    }

    #[test]
    fn test_ping_response_serialization() {
        let response = PingResponse::new(42, "0.3.0");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["server_uptime"], 42);
        assert_eq!(json["version"], "0.3.0");
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse::new("API key is incorrect");
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"error":"API key is incorrect"}"#);
    }
}
