//! # Token Cache Controller
//!
//! [`TokenManager`] owns the one token this service hands out, the instant it
//! stops being served, and the PNG renderings of it.
//!
//! ## Refresh
//!
//! A request that finds the token expired refreshes it while holding the
//! cache lock:
//! 1. Renderings of the old token are dropped.
//! 2. The cheap mode (current session cookies) is tried first.
//! 3. If that fails, the escalated mode (full browser login) runs once.
//! 4. On success the token and its expiry are replaced together. On double
//!    failure both stay as they were and the failure is returned.
//!
//! Concurrent callers queue on the lock, so at most one refresh runs at a
//! time. Callers that queued behind a failed refresh receive that same
//! failure instead of starting another one.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use qr_checkin_provider::config::Settings;
//! use qr_checkin_provider::session::TokenManager;
//! use std::sync::Arc;
//!
//! # async fn run() -> qr_checkin_provider::Result<()> {
//! let manager = TokenManager::from_settings(Arc::new(Settings::default())).await?;
//! let token = manager.get_token().await?;
//! let png = manager.get_rendered_image(256).await?;
//! println!("{} ({} bytes as PNG)", token, png.len());
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use super::pipeline::{SessionPipeline, TokenAcquirer};
use crate::{
    Error, Result,
    config::Settings,
    error::AcquisitionFailure,
    render::{QrPngRenderer, RenderCache, Renderer},
    types::{AcquisitionMode, CacheEntry},
};

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    renders: RenderCache,
    /// Most recent failed refresh, tagged with its attempt number
    last_failure: Option<(u64, AcquisitionFailure)>,
}

impl CacheState {
    fn needs_refresh(&self, now: Instant) -> bool {
        self.entry
            .as_ref()
            .is_none_or(|entry| entry.is_expired_at(now))
    }
}

/// Cache controller handing out the current token
pub struct TokenManager {
    state: Mutex<CacheState>,
    /// Number of refresh attempts that have finished, successful or not
    finished_attempts: AtomicU64,
    acquirer: Arc<dyn TokenAcquirer>,
    renderer: Arc<dyn Renderer>,
    freshness: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("finished_attempts", &self.finished_attempts)
            .field("freshness", &self.freshness)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager around an acquirer and a renderer
    pub fn new(
        acquirer: Arc<dyn TokenAcquirer>,
        renderer: Arc<dyn Renderer>,
        freshness: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            finished_attempts: AtomicU64::new(0),
            acquirer,
            renderer,
            freshness,
        }
    }

    /// Create the production manager: Chromium logins and QR PNG output
    pub async fn from_settings(settings: Arc<Settings>) -> Result<Self> {
        let freshness = settings.freshness_window();
        let pipeline = SessionPipeline::from_settings(settings).await?;
        Ok(Self::new(
            Arc::new(pipeline),
            Arc::new(QrPngRenderer::default()),
            freshness,
        ))
    }

    /// How long a token is served after it was acquired
    pub fn freshness_window(&self) -> Duration {
        self.freshness
    }

    /// Return a fresh token, refreshing it first when expired
    pub async fn get_token(&self) -> Result<String> {
        let state = self.fresh_state().await?;
        current_token(&state).map(str::to_string)
    }

    /// Return the current token as a `size`×`size` PNG
    pub async fn get_rendered_image(&self, size: u32) -> Result<Bytes> {
        let mut state = self.fresh_state().await?;
        let token = current_token(&state)?.to_string();
        state
            .renders
            .get_or_render(&token, size, self.renderer.as_ref())
    }

    /// The cached entry as it is, without refreshing
    pub async fn last_known(&self) -> Option<CacheEntry> {
        self.state.lock().await.entry.clone()
    }

    /// Expire the current token so the next request refreshes it
    pub async fn invalidate(&self) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.entry.as_mut() {
            entry.expires_at = Instant::now();
        }
        state.renders.clear();
        tracing::info!("Token invalidated");
    }

    /// Lock the cache, refreshing the token first if it has expired
    async fn fresh_state(&self) -> Result<MutexGuard<'_, CacheState>> {
        let seen_attempts = self.finished_attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().await;

        if !state.needs_refresh(Instant::now()) {
            return Ok(state);
        }

        if let Some((attempt, failure)) = &state.last_failure
            && *attempt > seen_attempts
        {
            tracing::debug!("Sharing failure of refresh attempt {}", attempt);
            return Err(Error::AcquisitionFailed(failure.clone()));
        }

        state.renders.clear();
        let outcome = self.acquire().await;
        let attempt = self.finished_attempts.fetch_add(1, Ordering::AcqRel) + 1;

        match outcome {
            Ok(token) => {
                let expires_at = Instant::now() + self.freshness;
                state.entry = Some(CacheEntry::new(token, expires_at));
                state.last_failure = None;
                tracing::info!("Token refreshed, valid for {:?}", self.freshness);
                Ok(state)
            }
            Err(failure) => {
                tracing::error!("Token refresh failed: {}", failure);
                state.last_failure = Some((attempt, failure.clone()));
                Err(Error::AcquisitionFailed(failure))
            }
        }
    }

    /// Cheap mode first, escalated mode once if that fails
    async fn acquire(&self) -> std::result::Result<String, AcquisitionFailure> {
        let cheap = match self.acquirer.acquire(AcquisitionMode::Cheap).await {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };

        if cheap.is_transient() {
            tracing::info!("Session rejected ({}), logging in again", cheap);
        } else {
            tracing::warn!("Cheap refresh failed ({}), logging in again", cheap);
        }

        match self.acquirer.acquire(AcquisitionMode::Escalated).await {
            Ok(token) => Ok(token),
            Err(escalated) => Err(AcquisitionFailure::new(&cheap, &escalated)),
        }
    }
}

fn current_token(state: &CacheState) -> Result<&str> {
    state
        .entry
        .as_ref()
        .map(|entry| entry.token.as_str())
        .ok_or_else(|| Error::internal("token cache is empty after refresh"))
}
