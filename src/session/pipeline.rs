//! Token acquisition pipeline
//!
//! Cheap mode re-uses the cookies of the current session. Escalated mode
//! throws that session away, logs in again through a browser and issues a
//! token with the freshly harvested cookies.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Instant, timeout_at};
use url::Url;

use super::{
    browser::{BrowserLauncher, SignalMatcher},
    login::LoginFlow,
    upstream::{ClientOptions, UpstreamSession},
};
use crate::{Error, Result, browser::ChromiumLauncher, config::Settings, types::AcquisitionMode};

/// Produces a fresh token in the requested mode
#[async_trait]
pub trait TokenAcquirer: Send + Sync {
    async fn acquire(&self, mode: AcquisitionMode) -> Result<String>;
}

/// Pipeline driving a real Chromium for logins
pub type SessionPipeline = SessionPipelineGeneric<ChromiumLauncher>;

/// Generic acquisition pipeline for testing and flexibility
#[derive(Debug)]
pub struct SessionPipelineGeneric<L: BrowserLauncher> {
    settings: Arc<Settings>,
    launcher: L,
    client_options: ClientOptions,
    session: RwLock<Arc<UpstreamSession>>,
    signal: SignalMatcher,
    cookie_url: Url,
}

impl SessionPipeline {
    /// Build the production pipeline: probe the proxy, load roots, locate Chromium
    pub async fn from_settings(settings: Arc<Settings>) -> Result<Self> {
        let client_options = ClientOptions::resolve(&settings).await?;
        let launcher = ChromiumLauncher::new(
            &settings.browser,
            settings.token.user_agent.clone(),
            client_options.proxy.clone(),
        );
        Self::with_launcher(settings, launcher, client_options)
    }
}

impl<L: BrowserLauncher> SessionPipelineGeneric<L> {
    /// Create a pipeline with a specific browser launcher
    pub fn with_launcher(
        settings: Arc<Settings>,
        launcher: L,
        client_options: ClientOptions,
    ) -> Result<Self> {
        let cookie_url = Url::parse(&settings.token.login_signal_url).map_err(|e| {
            Error::config(format!(
                "Invalid login signal URL {}: {}",
                settings.token.login_signal_url, e
            ))
        })?;
        let signal = SignalMatcher::response_url(settings.token.login_signal_url.clone());
        let session = UpstreamSession::new(&client_options)?;

        Ok(Self {
            settings,
            launcher,
            client_options,
            session: RwLock::new(Arc::new(session)),
            signal,
            cookie_url,
        })
    }

    async fn issue_with_current_session(&self) -> Result<String> {
        let session = self.session.read().await.clone();
        session.issue_token(&self.settings.token.issue_url).await
    }

    async fn login_and_issue(&self) -> Result<String> {
        // The old session is gone even if this login fails.
        let fresh = Arc::new(UpstreamSession::new(&self.client_options)?);
        *self.session.write().await = fresh.clone();

        let deadline = Instant::now() + self.settings.login_timeout();
        let mut browser = match timeout_at(deadline, self.launcher.launch()).await {
            Ok(Ok(browser)) => browser,
            Ok(Err(e)) => return Err(Error::login_flow("launch", e.to_string())),
            Err(_) => return Err(Error::login_flow("launch", "deadline exceeded")),
        };

        let flow = LoginFlow::new(
            &self.settings.credentials,
            &self.settings.token.login_url,
            &self.signal,
        );
        let cookies = flow.run(&mut browser, deadline).await?;
        drop(browser);

        fresh.install_cookies(&cookies, &self.cookie_url);
        fresh.issue_token(&self.settings.token.issue_url).await
    }
}

#[async_trait]
impl<L: BrowserLauncher> TokenAcquirer for SessionPipelineGeneric<L> {
    async fn acquire(&self, mode: AcquisitionMode) -> Result<String> {
        tracing::debug!("Acquiring token in {} mode", mode);
        match mode {
            AcquisitionMode::Cheap => self.issue_with_current_session().await,
            AcquisitionMode::Escalated => self.login_and_issue().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::login::tests::FakeBrowser;
    use crate::types::HarvestedCookie;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Default)]
    struct FakeLauncher {
        template: FakeBrowser,
        launches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        type Session = FakeBrowser;

        async fn launch(&self) -> Result<FakeBrowser> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::browser("no chromium"));
            }
            Ok(self.template.clone())
        }
    }

    fn settings_for(server: &MockServer) -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.credentials.id = "user@example.com".to_string();
        settings.credentials.password = "hunter2".to_string();
        settings.token.issue_url = format!("{}/api/v1/qr", server.uri());
        settings.token.login_url = format!("{}/login", server.uri());
        settings.token.login_signal_url = format!("{}/weblogin/account/info", server.uri());
        Arc::new(settings)
    }

    async fn mount_issuer(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/v1/qr"))
            .and(header("cookie", "_kawlt=fresh"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"qrData": "XYZ999"})),
            )
            .with_priority(1)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/qr"))
            .respond_with(ResponseTemplate::new(401))
            .with_priority(5)
            .mount(server)
            .await;
    }

    fn pipeline(
        settings: Arc<Settings>,
        launcher: FakeLauncher,
    ) -> SessionPipelineGeneric<FakeLauncher> {
        let options = ClientOptions::new(settings.token.user_agent.clone());
        SessionPipelineGeneric::with_launcher(settings, launcher, options).unwrap()
    }

    #[tokio::test]
    async fn test_cheap_mode_without_cookies_is_rejected() {
        let server = MockServer::start().await;
        mount_issuer(&server).await;

        let launcher = FakeLauncher::default();
        let pipeline = pipeline(settings_for(&server), launcher);

        let err = pipeline.acquire(AcquisitionMode::Cheap).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(pipeline.launcher.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_escalation_logs_in_and_keeps_session() {
        let server = MockServer::start().await;
        mount_issuer(&server).await;

        let browser = FakeBrowser::succeeding(vec![HarvestedCookie::new("_kawlt", "fresh")]);
        let launcher = FakeLauncher {
            template: browser.clone(),
            ..FakeLauncher::default()
        };
        let pipeline = pipeline(settings_for(&server), launcher);

        let token = pipeline.acquire(AcquisitionMode::Escalated).await.unwrap();
        assert_eq!(token, "XYZ999");
        assert_eq!(pipeline.launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(browser.recorded().first().map(String::as_str), Some("prepare"));
        assert!(
            browser
                .recorded()
                .contains(&format!("navigate {}/login", server.uri()))
        );

        // The harvested cookies stay with the session for later cheap refreshes.
        let token = pipeline.acquire(AcquisitionMode::Cheap).await.unwrap();
        assert_eq!(token, "XYZ999");
        assert_eq!(pipeline.launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_login_discards_previous_session() {
        let server = MockServer::start().await;
        mount_issuer(&server).await;

        let launcher = FakeLauncher {
            template: FakeBrowser::succeeding(vec![HarvestedCookie::new("_kawlt", "fresh")]),
            ..FakeLauncher::default()
        };
        let mut pipeline = pipeline(settings_for(&server), launcher);
        pipeline.acquire(AcquisitionMode::Escalated).await.unwrap();

        pipeline.launcher.template.fail_at = Some("wait_for_element");
        let err = pipeline
            .acquire(AcquisitionMode::Escalated)
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::LoginFlow { step, .. } if step == "wait_for_form"));

        // No cookies survive from the earlier login.
        let err = pipeline.acquire(AcquisitionMode::Cheap).await.unwrap_err();
        assert!(matches!(
            err,
            Error::TransientUpstream {
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_launch_failure_is_login_flow_error() {
        let server = MockServer::start().await;
        mount_issuer(&server).await;

        let launcher = FakeLauncher {
            fail: true,
            ..FakeLauncher::default()
        };
        let pipeline = pipeline(settings_for(&server), launcher);

        let err = pipeline
            .acquire(AcquisitionMode::Escalated)
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::LoginFlow { step, .. } if step == "launch"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_cookies_fails_issuance() {
        let server = MockServer::start().await;
        mount_issuer(&server).await;

        let launcher = FakeLauncher {
            template: FakeBrowser::succeeding(vec![HarvestedCookie::new("_kawlt", "stale")]),
            ..FakeLauncher::default()
        };
        let pipeline = pipeline(settings_for(&server), launcher);

        let err = pipeline
            .acquire(AcquisitionMode::Escalated)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
