//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the vidgrab REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the vidgrab REST API
///
/// Served at `/api/v1/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "vidgrab REST API",
        version = "0.1.0",
        description = "Drive a simulated video download job: submit a link, pick a format, follow progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790/api/v1", description = "Local development server")
    ),
    paths(
        // Catalog
        crate::api::routes::list_formats,

        // Job
        crate::api::routes::get_job,
        crate::api::routes::analyze_job,
        crate::api::routes::select_format,
        crate::api::routes::start_download,
        crate::api::routes::reset_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::UserId,
        crate::types::Status,
        crate::types::JobState,
        crate::types::JobRecord,
        crate::types::Event,

        // Catalog
        crate::catalog::DownloadOption,
        crate::catalog::MediaKind,

        // Config types from config.rs
        crate::config::Config,
        crate::config::SimulationConfig,
        crate::config::ProgressSchedule,
        crate::config::JobConfig,
        crate::config::PersistenceConfig,
        crate::config::ApiConfig,

        // API request/response types
        crate::api::routes::AnalyzeRequest,
        crate::api::routes::AnalyzeResponse,
        crate::api::routes::SelectFormatRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "formats", description = "Format catalog - The fixed list of audio and video outputs"),
        (name = "job", description = "Job - Analyze a link, select a format, download, reset"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
