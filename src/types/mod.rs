//! Type definitions for the check-in token provider
//!
//! This module contains the main data structures used for requests, responses
//! and the internal cache.

pub mod internal;
pub mod request;
pub mod response;
pub mod serde_helpers;

pub use internal::{AcquisitionMode, CacheEntry, HarvestedCookie, SameSite};
pub use request::{OutputFormat, QueryError, TokenQuery};
pub use response::{ErrorResponse, IssueResponse, PingResponse};
