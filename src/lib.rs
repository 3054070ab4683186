use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod routes;

use routes::{authenticated, public};

// --- Public Re-exports ---

pub use auth::{JwtVerifier, TokenVerifier, VerifierState};
pub use config::AppConfig;
pub use errors::{AuthError, ConfigError};
pub use gateway::{Decision, Gateway, GatewayState};
pub use policy::AccessPolicy;

/// ApiDoc
///
/// OpenAPI document for the endpoints the gateway serves itself. Everything else is
/// forwarded and documented by the downstream application.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::get_session),
    components(schemas(
        models::SessionClaims,
        models::Role,
        models::VerificationStatus
    )),
    tags((name = "recruit-gateway", description = "Marketplace request authorization gateway"))
)]
struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request: configuration, the
/// gateway (policy plus verifier) and the pooled upstream HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Gateway: the access policy and token verifier behind every decision.
    pub gateway: GatewayState,
    /// Configuration: The loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Upstream Client: pooled connections to the marketplace application.
    pub http: reqwest::Client,
}

impl AppState {
    /// build
    ///
    /// Assembles the state from configuration: resolves the access policy, creates
    /// the JWT verifier and the upstream client (redirects are relayed, not followed).
    pub fn build(config: AppConfig) -> Result<Self, ConfigError> {
        let policy = config.access_policy()?;
        let verifier = Arc::new(JwtVerifier::new(&config.jwt_secret)) as VerifierState;
        let gateway = Arc::new(Gateway::new(policy, verifier, config.session_cookie.clone()));
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            gateway,
            config,
            http,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for GatewayState {
    fn from_ref(app_state: &AppState) -> GatewayState {
        app_state.gateway.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the gateway's routes, the forwarding fallback, the authorization layer
/// and the observability stack.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Gateway-owned endpoints. `/health` is always public; `/api/session`
        // relies on the claims the gateway layer attaches.
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        // Anything else is the marketplace application's business.
        .fallback(handlers::forward)
        // Gateway: wraps every route above, fallback included. Decisions are made
        // on the canonical path, which is also the path forwarded upstream.
        .layer(middleware::from_fn_with_state(
            GatewayState::from_ref(&state),
            gateway::authorize,
        ))
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with its ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` set upstream in the
/// layer stack so every log line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
