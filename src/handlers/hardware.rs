use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::AppResult;
use crate::models::{AllocationForm, NewHardwareForm};
use crate::AppState;

pub async fn list_hardware_sets(
    State((engine, _, _)): State<AppState>,
) -> AppResult<Response> {
    let sets = engine.hardware_sets().await?;
    Ok(Json(sets).into_response())
}

pub async fn create_hardware_set(
    State((engine, _, _)): State<AppState>,
    Json(form): Json<NewHardwareForm>,
) -> AppResult<Response> {
    let set = engine
        .provision_hardware_set(&form.name, form.capacity)
        .await?;
    Ok((StatusCode::CREATED, Json(set)).into_response())
}

pub async fn check_out(
    State((engine, _, _)): State<AppState>,
    Json(form): Json<AllocationForm>,
) -> AppResult<Response> {
    let snapshot = engine
        .check_out(&form.name, form.amount, &form.project_id)
        .await?;
    Ok(Json(json!({
        "available": snapshot.available,
        "checked_out": snapshot.checked_out,
    }))
    .into_response())
}

pub async fn check_in(
    State((engine, _, _)): State<AppState>,
    Json(form): Json<AllocationForm>,
) -> AppResult<Response> {
    let snapshot = engine
        .check_in(&form.name, form.amount, &form.project_id)
        .await?;
    Ok(Json(json!({
        "available": snapshot.available,
        "checked_out": snapshot.checked_out,
    }))
    .into_response())
}
