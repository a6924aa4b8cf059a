//! Custom serde deserializers for DevTools payloads
//!
//! Provides custom deserializers for values the browser reports in loose formats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Deserialize a cookie expiry reported as seconds since the Unix epoch.
///
/// The browser reports session cookies with `-1` (or `0`), and fractional
/// seconds for persistent ones. Both session markers and out-of-range values
/// map to `None`, which leaves the cookie without an `Expires` attribute.
pub fn deserialize_cookie_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;

    Ok(value
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .and_then(|secs| DateTime::from_timestamp(secs.trunc() as i64, 0)))
}
