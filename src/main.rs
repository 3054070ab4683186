use recruit_gateway::{
    AppState,
    config::{AppConfig, Env},
    create_router,
};
use std::process::ExitCode;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, gateway state, then the HTTP server.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Configuration & Environment Loading
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            // The subscriber is not up yet; this is the only line printed directly.
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recruit_gateway=debug,tower_http=info".into());

    // 3. Pretty logs locally, JSON for the aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);
    match &config.upstream_url {
        Some(url) => tracing::info!("Forwarding allowed requests to {}", url),
        None => tracing::warn!("UPSTREAM_URL not set; unmatched requests will get 404"),
    }

    // 4. Gateway State (policy, verifier, upstream client)
    let bind_addr = config.bind_addr.clone();
    let app_state = match AppState::build(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("FATAL: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 5. Router and Server Startup
    let app = create_router(app_state);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("FATAL: failed to bind {}: {}", bind_addr, e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
