//! Token issuance client
//!
//! Owns the HTTP client and cookie jar of one authenticated session, and the
//! helpers that decide how that client reaches the network.

use reqwest::{
    Certificate, Client, StatusCode,
    cookie::Jar,
    header::{CONTENT_TYPE, HeaderValue},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::net::TcpStream;
use url::Url;

use crate::{Error, Result, config::Settings, types::HarvestedCookie, types::IssueResponse};

const ISSUE_BODY: &str = r#"{"epURL":null}"#;
const ISSUE_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// How session clients reach the network
#[derive(Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    /// Proxy URL, only set when the proxy answered the reachability probe
    pub proxy: Option<String>,
    pub extra_roots: Vec<Certificate>,
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("user_agent", &self.user_agent)
            .field("proxy", &self.proxy)
            .field("extra_roots", &self.extra_roots.len())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ClientOptions {
    /// Direct connection with the given user agent
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            proxy: None,
            extra_roots: Vec::new(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Resolve options from settings: probe the proxy and load extra roots
    pub async fn resolve(settings: &Settings) -> Result<Self> {
        let mut options = Self::new(settings.token.user_agent.clone());

        if let Some(proxy) = settings.get_proxy_url() {
            let timeout = Duration::from_millis(settings.network.proxy_probe_timeout_ms);
            if probe_proxy(&proxy, timeout).await {
                tracing::info!("Using proxy {}", proxy);
                options.proxy = Some(proxy);
            } else {
                tracing::warn!("Proxy {} is not reachable, connecting directly", proxy);
            }
        }

        if let Some(dir) = &settings.network.extra_ca_dir {
            options.extra_roots = load_extra_roots(dir)?;
        }

        Ok(options)
    }
}

/// HTTP client plus the cookie jar of one login
#[derive(Debug)]
pub struct UpstreamSession {
    client: Client,
    jar: Arc<Jar>,
}

impl UpstreamSession {
    /// Build a session with an empty cookie jar
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        let mut builder = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(options.user_agent.clone())
            .connect_timeout(options.connect_timeout);

        if let Some(proxy) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::config(format!("Invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        for root in &options.extra_roots {
            builder = builder.add_root_certificate(root.clone());
        }

        let client = builder.build()?;

        Ok(Self { client, jar })
    }

    /// Store harvested cookies as if `url` had set them
    pub fn install_cookies(&self, cookies: &[HarvestedCookie], url: &Url) {
        for cookie in cookies {
            self.jar.add_cookie_str(&cookie.to_set_cookie(), url);
        }
        tracing::debug!("Installed {} cookies for {}", cookies.len(), url);
    }

    /// Ask the issuance endpoint for a token using this session's cookies
    pub async fn issue_token(&self, issue_url: &str) -> Result<String> {
        let response = self
            .client
            .post(issue_url)
            .header(CONTENT_TYPE, HeaderValue::from_static(ISSUE_CONTENT_TYPE))
            .body(ISSUE_BODY)
            .send()
            .await
            .map_err(|e| Error::upstream_transport(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::upstream_status(
                status.as_u16(),
                format!("issuance endpoint returned {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::upstream_transport(format!("Failed to read body: {}", e)))?;

        let issued: IssueResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::malformed_response(format!("Undecodable body: {}", e)))?;

        if issued.qr_data.is_empty() {
            return Err(Error::malformed_response("qrData is empty"));
        }

        Ok(issued.qr_data)
    }
}

/// Check whether a TCP connection to the proxy succeeds within `timeout`
pub async fn probe_proxy(proxy: &str, timeout: Duration) -> bool {
    let Some(address) = proxy_address(proxy) else {
        tracing::warn!("Cannot determine proxy address from {}", proxy);
        return false;
    };

    match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!("Proxy probe to {} failed: {}", address, e);
            false
        }
        Err(_) => {
            tracing::debug!("Proxy probe to {} timed out", address);
            false
        }
    }
}

fn proxy_address(proxy: &str) -> Option<String> {
    let url = Url::parse(proxy).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}

/// Load every PEM certificate below `dir`, recursively
pub fn load_extra_roots(dir: &Path) -> Result<Vec<Certificate>> {
    let mut roots = Vec::new();
    let mut pending: Vec<PathBuf> = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }

            let pem = std::fs::read(&path)?;
            match Certificate::from_pem_bundle(&pem) {
                Ok(certs) if !certs.is_empty() => {
                    tracing::debug!("Loaded {} certificates from {}", certs.len(), path.display());
                    roots.extend(certs);
                }
                _ => tracing::warn!("No certificates appended from {}", path.display()),
            }
        }
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_issue_token_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/qr"))
            .and(header("content-type", ISSUE_CONTENT_TYPE))
            .and(header("user-agent", "test-agent"))
            .and(body_string(ISSUE_BODY))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"qrData": "ABC123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = UpstreamSession::new(&ClientOptions::new("test-agent")).unwrap();
        let token = session
            .issue_token(&format!("{}/api/v1/qr", server.uri()))
            .await
            .unwrap();
        assert_eq!(token, "ABC123");
    }

    #[tokio::test]
    async fn test_non_ok_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = UpstreamSession::new(&ClientOptions::new("test-agent")).unwrap();
        let err = session.issue_token(&server.uri()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(
            err,
            Error::TransientUpstream {
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_or_garbled_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"qrData": ""})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let session = UpstreamSession::new(&ClientOptions::new("test-agent")).unwrap();
        let empty = session
            .issue_token(&format!("{}/empty", server.uri()))
            .await
            .unwrap_err();
        let garbled = session
            .issue_token(&format!("{}/garbled", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(empty, Error::MalformedResponse(_)));
        assert!(matches!(garbled, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_installed_cookies_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("cookie", "session=fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"qrData": "XYZ999"})))
            .mount(&server)
            .await;

        let session = UpstreamSession::new(&ClientOptions::new("test-agent")).unwrap();
        let cookie_url = Url::parse(&format!("{}/weblogin/account/info", server.uri())).unwrap();
        session.install_cookies(&[HarvestedCookie::new("session", "fresh")], &cookie_url);

        let token = session
            .issue_token(&format!("{}/api/v1/qr", server.uri()))
            .await
            .unwrap();
        assert_eq!(token, "XYZ999");
    }

    #[tokio::test]
    async fn test_probe_proxy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = format!("http://{}", listener.local_addr().unwrap());
        assert!(probe_proxy(&open, Duration::from_secs(1)).await);

        let closed = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };
        assert!(!probe_proxy(&closed, Duration::from_secs(1)).await);
        assert!(!probe_proxy("not a url", Duration::from_secs(1)).await);
    }

    #[test]
    fn test_load_extra_roots_skips_non_pem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("notes.txt"), "hello").unwrap();

        let roots = load_extra_roots(dir.path()).unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn test_missing_ca_dir_is_error() {
        assert!(load_extra_roots(Path::new("/nonexistent/qr-checkin-ca")).is_err());
    }
}
