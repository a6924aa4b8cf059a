//! HTTP request handlers
//!
//! Implementation of the token, health and invalidation endpoints.

use crate::{
    server::app::AppState,
    types::{ErrorResponse, OutputFormat, PingResponse, TokenQuery},
    utils::version,
};
use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use std::net::SocketAddr;

pub const API_KEY_HEADER: &str = "x-api-key";
const REAL_IP_HEADER: &str = "x-real-ip";
const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorResponse::new(message)))
}

/// Serve the current token
///
/// GET /?type=txt|png&size=N
///
/// Requires the `X-API-KEY` header. Every path not claimed by another route
/// lands here.
pub async fn serve_token(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, HandlerError> {
    let remote = remote_address(&request);
    tracing::info!("{} {} {}", remote, request.method(), request.uri());

    if request.method() != Method::GET {
        return Err(error(StatusCode::NOT_FOUND, "Not found"));
    }

    if !is_authorized(request.headers(), &state.settings.server.api_key) {
        tracing::warn!("{} sent an incorrect API key", remote);
        return Err(error(StatusCode::UNAUTHORIZED, "API key is incorrect"));
    }

    let Query(query) = Query::<TokenQuery>::try_from_uri(request.uri())
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let format = query
        .output_format(
            state.settings.server.default_png_size,
            state.settings.server.max_png_size,
        )
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let manager = &state.token_manager;
    let (content_type, body) = match format {
        OutputFormat::Text => ("text/plain", manager.get_token().await.map(Bytes::from)),
        OutputFormat::Png { size } => ("image/png", manager.get_rendered_image(size).await),
    };

    match body {
        Ok(body) => Ok(token_response(content_type, body)),
        Err(e) => {
            tracing::error!("Failed to serve token to {}: {}", remote, e);
            Err(error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

fn token_response(content_type: &'static str, body: Bytes) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
            (header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE)),
        ],
        body,
    )
        .into_response()
}

/// Ping endpoint for health checks
///
/// GET /ping
///
/// Returns server status and uptime information.
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let uptime = state.start_time.elapsed().as_secs();
    tracing::debug!("Ping response: uptime={}s", uptime);
    Json(PingResponse::new(uptime, version::get_version()))
}

/// Invalidate the cached token
///
/// POST /invalidate
///
/// The next token request refreshes regardless of the freshness window.
pub async fn invalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, HandlerError> {
    if !is_authorized(&headers, &state.settings.server.api_key) {
        tracing::warn!("Invalidation rejected: API key is incorrect");
        return Err(error(StatusCode::UNAUTHORIZED, "API key is incorrect"));
    }

    state.token_manager.invalidate().await;
    Ok(StatusCode::NO_CONTENT)
}

fn is_authorized(headers: &HeaderMap, api_key: &str) -> bool {
    !api_key.is_empty()
        && headers
            .get(API_KEY_HEADER)
            .is_some_and(|value| value.as_bytes() == api_key.as_bytes())
}

/// Client address: `X-Real-IP` when a reverse proxy set it, else the peer
fn remote_address(request: &Request) -> String {
    if let Some(real_ip) = request
        .headers()
        .get(REAL_IP_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return real_ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unix".to_string())
}
