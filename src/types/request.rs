//! Request type definitions
//!
//! Defines the query accepted by the token endpoint and its validation.

use serde::{Deserialize, Serialize};

/// Raw query string of the token endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenQuery {
    /// `png`, `txt`, or empty
    #[serde(rename = "type")]
    pub format: Option<String>,

    /// PNG edge length in pixels
    pub size: Option<String>,
}

/// Representation returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The token itself as `text/plain`
    Text,
    /// The token encoded as a QR code, `image/png` of the given edge length
    Png { size: u32 },
}

/// Why a token query was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("unsupported type: {0}")]
    UnsupportedFormat(String),
    #[error("invalid size: {0}")]
    InvalidSize(String),
    #[error("size {size} is outside 1..={max}")]
    SizeOutOfRange { size: u32, max: u32 },
}

impl TokenQuery {
    /// Create an empty query (plain text)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output type
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Set the PNG size
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Resolve the query into an output format.
    ///
    /// `size` is only looked at for PNG output, matching the behavior callers rely on.
    pub fn output_format(
        &self,
        default_size: u32,
        max_size: u32,
    ) -> Result<OutputFormat, QueryError> {
        match self.format.as_deref().unwrap_or("") {
            "" | "txt" => Ok(OutputFormat::Text),
            "png" => {
                let size = match self.size.as_deref().filter(|s| !s.is_empty()) {
                    None => default_size,
                    Some(raw) => raw
                        .parse::<u32>()
                        .map_err(|_| QueryError::InvalidSize(raw.to_string()))?,
                };

                if size == 0 || size > max_size {
                    return Err(QueryError::SizeOutOfRange {
                        size,
                        max: max_size,
                    });
                }

                Ok(OutputFormat::Png { size })
            }
            other => Err(QueryError::UnsupportedFormat(other.to_string())),
        }
    }
}
