//! REST API server module
//!
//! Exposes one [`JobMachine`] over HTTP: the format catalog, the current job,
//! the job operations and a server-sent events stream of lifecycle events.

use crate::{Config, JobMachine, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Prefix all routes are served under by [`start_api_server`]
pub const API_PREFIX: &str = "/api/v1";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Catalog
/// - `GET /formats` - List selectable formats (optionally `?kind=audio|video`)
///
/// ## Job
/// - `GET /job` - Current job state
/// - `POST /job/analyze` - Submit a link
/// - `PUT /job/format` - Select a format
/// - `POST /job/download` - Start the simulated download
/// - `POST /job/reset` - Return to idle
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /events` - Server-sent events stream
pub fn create_router(machine: JobMachine, config: Arc<Config>) -> Router {
    let state = AppState::new(machine, config.clone());

    let router = Router::new()
        // Catalog
        .route("/formats", get(routes::list_formats))
        // Job
        .route("/job", get(routes::get_job))
        .route("/job/analyze", post(routes::analyze_job))
        .route("/job/format", put(routes::select_format))
        .route("/job/download", post(routes::start_download))
        .route("/job/reset", post(routes::reset_job))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .with_state(state);

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins that parse as header values are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the listener fails or the task is dropped.
///
/// # Example
///
/// ```no_run
/// use vidgrab::{Config, JobMachine};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let machine = JobMachine::new((*config).clone())?;
///
/// // Start API server (blocks until shutdown)
/// vidgrab::api::start_api_server(machine, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(machine: JobMachine, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = Router::new()
        .nest(API_PREFIX, create_router(machine, config))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
