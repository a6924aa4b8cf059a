//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the check-in token provider.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration settings for the check-in token provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Account used for the interactive login
    pub credentials: CredentialSettings,
    /// Server configuration
    pub server: ServerSettings,
    /// Token acquisition and caching configuration
    pub token: TokenSettings,
    /// Outbound network configuration
    pub network: NetworkSettings,
    /// Headless browser configuration
    pub browser: BrowserSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Login credentials
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    /// Account id (e-mail or phone number)
    pub id: String,
    /// Account password
    pub password: String,
}

impl std::fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// `host:port` for TCP, anything else is a Unix socket path
    pub bind: String,
    /// Value expected in the `X-API-KEY` header
    pub api_key: String,
    /// PNG edge length used when the request carries no `size`
    pub default_png_size: u32,
    /// Largest accepted PNG edge length
    pub max_png_size: u32,
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind", &self.bind)
            .field("api_key", &"<redacted>")
            .field("default_png_size", &self.default_png_size)
            .field("max_png_size", &self.max_png_size)
            .finish()
    }
}

/// Token acquisition and caching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// Seconds a token is served before it is refreshed
    pub freshness_secs: u64,
    /// Upper bound for one interactive login, in seconds
    pub login_timeout_secs: u64,
    /// Token issuance endpoint
    pub issue_url: String,
    /// Login entry point opened in the browser
    pub login_url: String,
    /// Response URL that signals a completed login
    pub login_signal_url: String,
    /// User agent shared by the HTTP client and the browser
    pub user_agent: String,
}

/// Outbound network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Optional HTTP proxy, `host:port` or a full URL
    pub proxy: Option<String>,
    /// How long to wait for the proxy to accept a TCP connection
    pub proxy_probe_timeout_ms: u64,
    /// Directory of additional PEM root certificates
    pub extra_ca_dir: Option<PathBuf>,
}

/// Headless browser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Chromium executable; discovered on `PATH` when unset
    pub executable: Option<PathBuf>,
    /// Run without a window
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Additional command-line flags, e.g. `--no-sandbox` inside containers
    pub extra_args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

/// Mobile KakaoTalk in-app browser, which the check-in service expects.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148 KAKAOTALK 9.4.2";

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            api_key: String::new(),
            default_png_size: 256,
            max_png_size: 2048,
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            freshness_secs: 14,
            login_timeout_secs: 30,
            issue_url: "https://vaccine-qr.kakao.com/api/v1/qr".to_string(),
            login_url: "https://accounts.kakao.com/login?continue=https%3A%2F%2Faccounts.kakao.com%2Fweblogin%2Faccount%2Finfo".to_string(),
            login_signal_url: "https://accounts.kakao.com/weblogin/account/info".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            proxy: None,
            proxy_probe_timeout_ms: 1000,
            extra_ca_dir: None,
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window_width: 375,
            window_height: 667,
            extra_args: Vec::new(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

/// Flat `config.json` layout used by earlier deployments
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(rename = "kakao-id", default)]
    kakao_id: String,
    #[serde(rename = "kakao-pw", default)]
    kakao_pw: String,
    #[serde(rename = "api-key", default)]
    api_key: String,
    #[serde(default)]
    bind: String,
    #[serde(default)]
    proxy: String,
}

impl From<LegacyConfig> for Settings {
    fn from(legacy: LegacyConfig) -> Self {
        let mut settings = Settings::default();
        settings.credentials.id = legacy.kakao_id;
        settings.credentials.password = legacy.kakao_pw;
        settings.server.api_key = legacy.api_key;
        if !legacy.bind.is_empty() {
            settings.server.bind = legacy.bind;
        }
        settings.network.proxy = Some(legacy.proxy).filter(|p| !p.is_empty());
        settings
    }
}

impl Settings {
    /// Load settings from a TOML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Ok(toml::from_str(&content)?)
        }
    }

    /// Parse JSON settings, accepting the flat legacy layout as well
    pub fn from_json_str(content: &str) -> crate::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        if value.get("kakao-id").is_some() || value.get("api-key").is_some() {
            let legacy: LegacyConfig = serde_json::from_value(value)?;
            return Ok(legacy.into());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Override fields that have a matching environment variable
    pub fn merge_with_env(self) -> crate::Result<Self> {
        self.merge_with_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from a variable lookup using the `QR_CHECKIN_*` names
    pub fn merge_with_vars<F>(mut self, lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("QR_CHECKIN_ID") {
            self.credentials.id = id;
        }

        if let Some(password) = lookup("QR_CHECKIN_PASSWORD") {
            self.credentials.password = password;
        }

        if let Some(api_key) = lookup("QR_CHECKIN_API_KEY") {
            self.server.api_key = api_key;
        }

        if let Some(bind) = lookup("QR_CHECKIN_BIND") {
            self.server.bind = bind;
        }

        if let Some(proxy) = lookup("QR_CHECKIN_PROXY") {
            self.network.proxy = Some(proxy).filter(|p| !p.is_empty());
        }

        if let Some(freshness) = lookup("QR_CHECKIN_FRESHNESS_SECS") {
            self.token.freshness_secs = freshness
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid freshness window: {}", e)))?;
        }

        if let Some(executable) = lookup("QR_CHECKIN_CHROMIUM") {
            self.browser.executable = Some(PathBuf::from(executable));
        }

        Ok(self)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.credentials.id.is_empty() || self.credentials.password.is_empty() {
            return Err(crate::Error::config("credentials.id and credentials.password are required"));
        }

        if self.server.api_key.is_empty() {
            return Err(crate::Error::config("server.api_key is required"));
        }

        if self.server.bind.trim().is_empty() {
            return Err(crate::Error::config("server.bind must not be empty"));
        }

        if self.token.freshness_secs == 0 {
            return Err(crate::Error::config("token.freshness_secs must be greater than 0"));
        }

        if self.token.login_timeout_secs == 0 {
            return Err(crate::Error::config("token.login_timeout_secs must be greater than 0"));
        }

        if self.server.default_png_size == 0
            || self.server.default_png_size > self.server.max_png_size
        {
            return Err(crate::Error::config(format!(
                "server.default_png_size must be between 1 and {}",
                self.server.max_png_size
            )));
        }

        for url in [
            &self.token.issue_url,
            &self.token.login_url,
            &self.token.login_signal_url,
        ] {
            url::Url::parse(url)
                .map_err(|e| crate::Error::config(format!("Invalid URL {}: {}", url, e)))?;
        }

        Ok(())
    }

    /// Freshness window as a duration
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.token.freshness_secs)
    }

    /// Login deadline as a duration
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.token.login_timeout_secs)
    }

    /// Configured proxy as a URL usable by the HTTP client
    pub fn get_proxy_url(&self) -> Option<String> {
        self.network.proxy.as_ref().map(|proxy| {
            if proxy.contains("://") {
                proxy.clone()
            } else {
                format!("http://{}", proxy)
            }
        })
    }
}
