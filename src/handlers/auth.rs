use axum::{
    extract::{Json, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::{AppError, AppResult};
use crate::models::{LoginForm, RegisterForm};
use crate::AppState;

pub async fn index() -> impl IntoResponse {
    "hardware reservation service"
}

pub async fn handle_register(
    State((_, auth, _)): State<AppState>,
    Json(form): Json<RegisterForm>,
) -> AppResult<Response> {
    tracing::info!("registration attempt for user: {}", form.username);

    let token = auth.register(&form.username, &form.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful", "token": token })),
    )
        .into_response())
}

pub async fn handle_login(
    State((_, auth, _)): State<AppState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Response> {
    tracing::info!("login attempt for user: {}", form.username);

    let token = auth.login(&form.username, &form.password).await?;
    Ok(Json(json!({ "message": "Login successful", "token": token })).into_response())
}

pub async fn handle_logout(
    State((_, auth, _)): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".into()))?;

    auth.logout(token).await?;
    Ok(Json(json!({ "message": "Logged out" })).into_response())
}
