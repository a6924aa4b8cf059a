//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

/// Test helper functions
pub mod helpers {
    use async_trait::async_trait;
    use qr_checkin_provider::{
        Result, Settings,
        session::{BrowserLauncher, BrowserSession, SignalMatcher, SignalOutcome},
        types::HarvestedCookie,
    };
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    pub const API_KEY: &str = "integration-key";

    /// Settings pointing every upstream URL at `base`
    pub fn settings_for(base: &str) -> Settings {
        let mut settings = Settings::default();
        settings.credentials.id = "user@example.com".to_string();
        settings.credentials.password = "hunter2".to_string();
        settings.server.api_key = API_KEY.to_string();
        settings.token.issue_url = format!("{}/api/v1/qr", base);
        settings.token.login_url = format!("{}/login", base);
        settings.token.login_signal_url = format!("{}/weblogin/account/info", base);
        settings
    }

    /// Write `contents` to a temporary file with the given suffix
    pub fn config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// Browser that logs in successfully and hands out fixed cookies
    #[derive(Debug, Clone)]
    pub struct ScriptedBrowser {
        cookies: Vec<HarvestedCookie>,
    }

    #[async_trait]
    impl BrowserSession for ScriptedBrowser {
        async fn prepare(&mut self) -> Result<()> {
            Ok(())
        }

        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn wait_for_element(&mut self, _selector: &str, _deadline: Instant) -> Result<()> {
            Ok(())
        }

        async fn set_form_field(&mut self, _selector: &str, _value: &str) -> Result<()> {
            Ok(())
        }

        async fn click(&mut self, _selector: &str) -> Result<()> {
            Ok(())
        }

        async fn wait_for_signal(
            &mut self,
            _matcher: &SignalMatcher,
            _deadline: Instant,
        ) -> Result<SignalOutcome> {
            Ok(SignalOutcome::Received)
        }

        async fn harvest_cookies(&mut self) -> Result<Vec<HarvestedCookie>> {
            Ok(self.cookies.clone())
        }
    }

    /// Launcher counting how many logins were started
    #[derive(Debug, Clone)]
    pub struct ScriptedLauncher {
        pub launches: Arc<AtomicUsize>,
        cookies: Vec<HarvestedCookie>,
    }

    impl ScriptedLauncher {
        pub fn with_cookie(name: &str, value: &str) -> Self {
            Self {
                launches: Arc::default(),
                cookies: vec![HarvestedCookie::new(name, value)],
            }
        }

        pub fn launch_count(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BrowserLauncher for ScriptedLauncher {
        type Session = ScriptedBrowser;

        async fn launch(&self) -> Result<ScriptedBrowser> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptedBrowser {
                cookies: self.cookies.clone(),
            })
        }
    }
}
