//! Reference-data CRUD: the commission list feeding the report form and the
//! managers contact directory. Mounted under /admin behind the admin guard,
//! except `managers_directory` which any authenticated user may read.

use anyhow::anyhow;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crflash_db::models::{CommissionRow, ManagerRow};
use crflash_types::api::{CommissionRequest, ManagerRequest};
use crflash_types::models::{Commission, Manager};

use crate::auth::AppState;
use crate::error::ApiError;

// -- Commissions --

pub async fn list_commissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Commission>>, ApiError> {
    let rows = state.db.list_commissions()?;
    let commissions = rows
        .into_iter()
        .map(commission_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(commissions))
}

pub async fn create_commission(
    State(state): State<AppState>,
    Json(req): Json<CommissionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }

    let id = Uuid::new_v4();
    state.db.insert_commission(&id.to_string(), &req.name)?;

    Ok((
        StatusCode::CREATED,
        Json(Commission { id, name: req.name }),
    ))
}

pub async fn update_commission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommissionRequest>,
) -> Result<Json<Commission>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }

    if !state.db.update_commission(&id.to_string(), &req.name)? {
        return Err(ApiError::NotFound("commission"));
    }

    Ok(Json(Commission { id, name: req.name }))
}

pub async fn delete_commission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.delete_commission(&id.to_string())? {
        return Err(ApiError::NotFound("commission"));
    }
    Ok(Json(json!({ "success": true })))
}

// -- Managers directory --

pub async fn list_managers(State(state): State<AppState>) -> Result<Json<Vec<Manager>>, ApiError> {
    let rows = state.db.list_managers()?;
    let managers = rows
        .into_iter()
        .map(manager_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(managers))
}

/// Same list as `list_managers`, mounted on the authenticated (non-admin)
/// router: the report form shows it as a read-only dropdown.
pub async fn managers_directory(
    State(state): State<AppState>,
) -> Result<Json<Vec<Manager>>, ApiError> {
    list_managers(State(state)).await
}

pub async fn create_manager(
    State(state): State<AppState>,
    Json(req): Json<ManagerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::Validation("name and email are required".into()));
    }

    let id = Uuid::new_v4();
    state
        .db
        .insert_manager(&id.to_string(), &req.name, &req.email)?;

    Ok((
        StatusCode::CREATED,
        Json(Manager {
            id,
            name: req.name,
            email: req.email,
        }),
    ))
}

pub async fn update_manager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ManagerRequest>,
) -> Result<Json<Manager>, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(ApiError::Validation("name and email are required".into()));
    }

    if !state
        .db
        .update_manager(&id.to_string(), &req.name, &req.email)?
    {
        return Err(ApiError::NotFound("manager"));
    }

    Ok(Json(Manager {
        id,
        name: req.name,
        email: req.email,
    }))
}

pub async fn delete_manager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.db.delete_manager(&id.to_string())? {
        return Err(ApiError::NotFound("manager"));
    }
    Ok(Json(json!({ "success": true })))
}

fn commission_from_row(row: CommissionRow) -> Result<Commission, ApiError> {
    Ok(Commission {
        id: parse_uuid(&row.id)?,
        name: row.name,
    })
}

fn manager_from_row(row: ManagerRow) -> Result<Manager, ApiError> {
    Ok(Manager {
        id: parse_uuid(&row.id)?,
        name: row.name,
        email: row.email,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse()
        .map_err(|_| ApiError::Upstream(anyhow!("corrupt uuid in store: {}", s)))
}
