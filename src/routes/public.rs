use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints under the gateway's internal prefixes. The gateway never asks these
/// for a token, so they stay reachable for load balancers and orchestration probes.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
}
