//! Format catalog handler.

use super::FormatsQuery;
use crate::catalog::{DownloadOption, FORMAT_CATALOG, options_of_kind};
use axum::{Json, extract::Query, response::IntoResponse};

/// GET /formats - List selectable formats
#[utoipa::path(
    get,
    path = "/api/v1/formats",
    tag = "formats",
    params(FormatsQuery),
    responses(
        (status = 200, description = "Format catalog", body = Vec<DownloadOption>)
    )
)]
pub async fn list_formats(Query(query): Query<FormatsQuery>) -> impl IntoResponse {
    let options: Vec<DownloadOption> = match query.kind {
        Some(kind) => options_of_kind(kind).copied().collect(),
        None => FORMAT_CATALOG.to_vec(),
    };
    Json(options)
}
