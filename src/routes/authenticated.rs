use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Endpoints that take `SessionClaims` as an argument. They are not listed in any
/// public route set, so the gateway always verifies a token before they run.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /api/session
        // Returns the caller's normalized role and verification status.
        .route("/api/session", get(handlers::get_session))
}
