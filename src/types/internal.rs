//! Internal data structures
//!
//! Defines the data types shared by the token cache and the acquisition pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::serde_helpers::deserialize_cookie_expiry;

/// Current token together with the instant it stops being served.
///
/// Both fields are always replaced together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Opaque token handed out by the issuance endpoint
    pub token: String,
    /// Instant after which the token must be refreshed before serving
    pub expires_at: Instant,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new(token: impl Into<String>, expires_at: Instant) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Which acquisition path to take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMode {
    /// Re-use the cookies of the current session
    Cheap,
    /// Log in again through the browser, then issue with the new cookies
    Escalated,
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cheap => write!(f, "cheap"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Cookie `SameSite` policy as reported by the browser
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
    /// Attribute absent; the client applies its default
    #[default]
    #[serde(other)]
    Unspecified,
}

/// Cookie harvested from the browser after a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestedCookie {
    pub name: String,
    pub value: String,
    /// Empty for host-only cookies
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "deserialize_cookie_expiry")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: SameSite,
}

impl HarvestedCookie {
    /// Create a host-only session cookie with path `/`
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: SameSite::Unspecified,
        }
    }

    /// Set the cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the cookie expiry
    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Render the cookie as a `Set-Cookie` header value
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}", self.name, self.value);

        if !self.domain.is_empty() {
            header.push_str("; Domain=");
            header.push_str(&self.domain);
        }

        let path = if self.path.is_empty() { "/" } else { &self.path };
        header.push_str("; Path=");
        header.push_str(path);

        if let Some(expires) = self.expires {
            header.push_str("; Expires=");
            header.push_str(&expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        }

        if self.secure {
            header.push_str("; Secure");
        }

        if self.http_only {
            header.push_str("; HttpOnly");
        }

        match self.same_site {
            SameSite::Strict => header.push_str("; SameSite=Strict"),
            SameSite::Lax => header.push_str("; SameSite=Lax"),
            SameSite::None => header.push_str("; SameSite=None"),
            SameSite::Unspecified => {}
        }

        header
    }
}
