//! Error handling for the check-in token provider
//!
//! This module defines error types and handling patterns used throughout the application.

pub mod types;

pub use types::{AcquisitionFailure, Error, Result};
