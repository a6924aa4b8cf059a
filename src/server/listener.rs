//! Listening socket selection and serving
//!
//! `server.bind` is either `host:port` for TCP or a filesystem path for a
//! Unix domain socket.

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::{Error, Result};

/// Where the server listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAddress {
    Tcp(String),
    Unix(PathBuf),
}

impl BindAddress {
    /// Anything with a path separator, or without a numeric port, is a socket path
    pub fn parse(bind: &str) -> Self {
        if bind.contains('/') {
            return Self::Unix(PathBuf::from(bind));
        }
        match bind.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => Self::Tcp(bind.to_string()),
            _ => Self::Unix(PathBuf::from(bind)),
        }
    }
}

impl std::fmt::Display for BindAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Serve `app` on `bind` until `shutdown` resolves
pub async fn serve<F>(app: Router, bind: &BindAddress, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match bind {
        BindAddress::Tcp(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| Error::server(format!("Failed to bind {}: {}", addr, e)))?;
            tracing::info!("Listening on {}", listener.local_addr()?);
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown)
            .await?;
            Ok(())
        }
        BindAddress::Unix(path) => serve_unix(app, path, shutdown).await,
    }
}

#[cfg(unix)]
async fn serve_unix<F>(app: Router, path: &std::path::Path, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    use std::os::unix::fs::PermissionsExt;

    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed stale socket {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = tokio::net::UnixListener::bind(path)
        .map_err(|e| Error::server(format!("Failed to bind {}: {}", path.display(), e)))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))?;
    tracing::info!("Listening on unix://{}", path.display());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Failed to remove socket {}: {}", path.display(), e);
    }
    served.map_err(Error::from)
}

#[cfg(not(unix))]
async fn serve_unix<F>(_app: Router, path: &std::path::Path, _shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    Err(Error::config(format!(
        "Unix socket {} is not supported on this platform",
        path.display()
    )))
}
