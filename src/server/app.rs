//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::{config::Settings, session::TokenManager};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Token cache controller
    pub token_manager: Arc<TokenManager>,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(token_manager: Arc<TokenManager>, settings: Arc<Settings>) -> Self {
        Self {
            token_manager,
            settings,
            start_time: std::time::Instant::now(),
        }
    }

    /// Build the production state from validated settings
    pub async fn from_settings(settings: Arc<Settings>) -> crate::Result<Self> {
        let token_manager = TokenManager::from_settings(settings.clone()).await?;
        Ok(Self::new(Arc::new(token_manager), settings))
    }
}

/// Create the main Axum application with routes and middleware.
///
/// Every path other than the named routes serves the token.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(super::handlers::ping))
        .route("/invalidate", post(super::handlers::invalidate))
        .fallback(super::handlers::serve_token)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
