use crate::{AppState, models::SessionClaims};
use axum::{
    Json,
    body::{self, Body},
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};

/// Upper bound on a buffered request body forwarded upstream.
const MAX_FORWARD_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Connection-scoped headers that must not be relayed between hops.
const HOP_BY_HOP: [header::HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// health
///
/// [Internal Route] Liveness probe. Never authenticated.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Gateway is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_session
///
/// [Authenticated Route] Echoes the normalized claims the gateway verified for this
/// request, so clients can discover their role and onboarding state.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Verified session", body = SessionClaims),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn get_session(claims: SessionClaims) -> Json<SessionClaims> {
    Json(claims)
}

/// forward
///
/// Fallback for every allowed request the gateway does not serve itself: relays it
/// to `UPSTREAM_URL` with method, path, query, headers and body intact, and relays
/// the upstream answer back.
///
/// Returns 404 when no upstream is configured and 502 when it cannot be reached.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let Some(upstream) = state.config.upstream_url.as_deref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    // The gateway layer has already rewritten the URI to its canonical path.
    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{upstream}{path_and_query}");

    let body = match body::to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer request body for {}: {:?}", url, e);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    // Cookies and authorization headers pass through untouched.
    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    let upstream_response = match state
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Upstream request to {} failed: {:?}", url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    // Relay status, headers and body as the upstream sent them.
    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes = match upstream_response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to read upstream response from {}: {:?}", url, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    response
}
