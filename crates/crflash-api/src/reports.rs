use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crflash_types::api::{Claims, CreateReportRequest, ReportPatch};
use crflash_types::models::{HistoryEntry, Report};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::lifecycle;

/// Run a lifecycle operation off the async runtime; rusqlite calls block.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Upstream(anyhow!("spawn_blocking join error: {}", e)))?
}

pub async fn list_reports(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let reports = run_blocking(move || lifecycle::list(&state.db, &claims)).await?;
    Ok(Json(reports))
}

pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = run_blocking(move || lifecycle::create(&state.db, &claims, req)).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Report>, ApiError> {
    let report = run_blocking(move || lifecycle::read(&state.db, &claims, id)).await?;
    Ok(Json(report))
}

pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(patch): Json<ReportPatch>,
) -> Result<Json<Report>, ApiError> {
    let report = run_blocking(move || lifecycle::update(&state.db, &claims, id, patch)).await?;
    Ok(Json(report))
}

pub async fn submit_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Report>, ApiError> {
    let report = run_blocking(move || lifecycle::submit(&state.db, &claims, id)).await?;
    Ok(Json(report))
}

pub async fn report_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let entries = run_blocking(move || lifecycle::history(&state.db, &claims, id)).await?;
    Ok(Json(entries))
}
