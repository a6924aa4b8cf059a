//! Headless Chromium process management

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};

use super::{cdp::CdpConnection, finder::find_chromium, session::CdpSession};
use crate::{Error, Result, config::settings::BrowserSettings, session::BrowserLauncher};

const DEVTOOLS_BANNER: &str = "DevTools listening on ";

/// Launches a throwaway Chromium per login
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    headless: bool,
    window: (u32, u32),
    user_agent: String,
    proxy: Option<String>,
    extra_args: Vec<String>,
}

/// Running browser; killed and its profile deleted on drop
#[derive(Debug)]
pub struct BrowserProcess {
    _child: Child,
    _profile: TempDir,
}

impl ChromiumLauncher {
    pub fn new(settings: &BrowserSettings, user_agent: String, proxy: Option<String>) -> Self {
        Self {
            executable: settings.executable.clone(),
            headless: settings.headless,
            window: (settings.window_width, settings.window_height),
            user_agent,
            proxy,
            extra_args: settings.extra_args.clone(),
        }
    }

    /// Command-line flags for a browser using `profile` as its data dir
    pub fn args(&self, profile: &std::path::Path) -> Vec<String> {
        let mut args = vec![
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
            format!("--window-size={},{}", self.window.0, self.window.1),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(proxy) = &self.proxy {
            args.push(format!("--proxy-server={}", proxy));
        }
        args.extend(self.extra_args.iter().cloned());
        args.push("about:blank".to_string());
        args
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Session = CdpSession;

    async fn launch(&self) -> Result<CdpSession> {
        let executable = find_chromium(self.executable.as_deref())
            .ok_or_else(|| Error::browser("Could not find a Chromium executable"))?;
        let profile = tempfile::Builder::new()
            .prefix("qr-checkin-profile-")
            .tempdir()?;

        tracing::debug!("Launching {}", executable.display());
        let mut child = Command::new(&executable)
            .args(self.args(profile.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::browser(format!("Failed to launch {}: {}", executable.display(), e))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::internal("browser stderr was not captured"))?;
        let endpoint = read_devtools_endpoint(stderr).await?;
        tracing::debug!("Browser DevTools endpoint: {}", endpoint);

        let connection = CdpConnection::connect(&endpoint).await?;
        let process = BrowserProcess {
            _child: child,
            _profile: profile,
        };
        CdpSession::attach(connection, process).await
    }
}

/// Wait for the DevTools banner, then keep draining stderr in the background
async fn read_devtools_endpoint(stderr: ChildStderr) -> Result<String> {
    let mut lines = BufReader::new(stderr).lines();

    while let Some(line) = lines.next_line().await? {
        if let Some(endpoint) = parse_devtools_banner(&line) {
            let endpoint = endpoint.to_string();
            tokio::spawn(async move {
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::trace!("chromium: {}", line);
                }
            });
            return Ok(endpoint);
        }
        tracing::trace!("chromium: {}", line);
    }

    Err(Error::browser(
        "Browser exited before announcing its DevTools endpoint",
    ))
}

pub(crate) fn parse_devtools_banner(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix(DEVTOOLS_BANNER)
        .map(str::trim)
        .filter(|endpoint| endpoint.starts_with("ws://"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn launcher(proxy: Option<&str>) -> ChromiumLauncher {
        let settings = BrowserSettings {
            extra_args: vec!["--no-sandbox".to_string()],
            ..BrowserSettings::default()
        };
        ChromiumLauncher::new(&settings, "test-agent".to_string(), proxy.map(String::from))
    }

    #[test]
    fn test_parse_devtools_banner() {
        assert_eq!(
            parse_devtools_banner(
                "DevTools listening on ws://127.0.0.1:39017/devtools/browser/6f1b2c"
            ),
            Some("ws://127.0.0.1:39017/devtools/browser/6f1b2c")
        );
        assert_eq!(parse_devtools_banner("[0101/000000.000:ERROR:gpu] oops"), None);
        assert_eq!(parse_devtools_banner("DevTools listening on "), None);
    }

    #[test]
    fn test_args() {
        let args = launcher(Some("http://10.0.0.1:3128")).args(Path::new("/tmp/profile"));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--window-size=375,667".to_string()));
        assert!(args.contains(&"--user-agent=test-agent".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--proxy-server=http://10.0.0.1:3128".to_string()));
        assert!(args.contains(&"--no-sandbox".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));

        let args = launcher(None).args(Path::new("/tmp/profile"));
        assert!(!args.iter().any(|arg| arg.starts_with("--proxy-server")));
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let settings = BrowserSettings {
            executable: Some(PathBuf::from("/nonexistent/qr-checkin/chromium")),
            ..BrowserSettings::default()
        };
        let launcher = ChromiumLauncher::new(&settings, "test-agent".to_string(), None);
        let err = launcher.launch().await.unwrap_err();
        assert!(matches!(err, Error::Browser(_)));
    }
}
