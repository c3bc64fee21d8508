//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`formats`] - Format catalog
//! - [`job`] - Current job and its operations
//! - [`system`] - Health, events, OpenAPI

use crate::catalog::MediaKind;
use crate::types::JobId;
use serde::{Deserialize, Serialize};

mod formats;
mod job;
mod system;

pub use formats::*;
pub use job::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /formats
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct FormatsQuery {
    /// Only list formats of this kind
    pub kind: Option<MediaKind>,
}

/// Request body for POST /job/analyze
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnalyzeRequest {
    /// Video link as entered by the user
    pub url: String,
}

/// Response for POST /job/analyze
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnalyzeResponse {
    /// Id of the job now being analyzed
    pub id: JobId,
}

/// Request body for PUT /job/format
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SelectFormatRequest {
    /// Catalog id, e.g. `mp3-320`
    pub format: String,
}
