use axum::{
    extract::{Extension, Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::errors::AppResult;
use crate::middleware::Identity;
use crate::models::{NewProjectForm, ProjectsQuery, ToggleForm};
use crate::AppState;

pub async fn create_project(
    State((engine, _, _)): State<AppState>,
    Extension(Identity(user)): Extension<Identity>,
    Json(form): Json<NewProjectForm>,
) -> AppResult<Response> {
    let project = engine
        .create_project(&user, &form.name, &form.description)
        .await?;
    let projects = engine.projects(Some(&user)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Project {} created", project.id),
            "projects": projects,
        })),
    )
        .into_response())
}

pub async fn toggle_membership(
    State((engine, _, _)): State<AppState>,
    Extension(Identity(user)): Extension<Identity>,
    Json(form): Json<ToggleForm>,
) -> AppResult<Response> {
    let joined = engine.toggle_membership(&user, &form.projectid).await?;
    let projects = engine.projects(Some(&user)).await?;
    let message = if joined {
        format!("Joined project {}", form.projectid)
    } else {
        format!("Left project {}", form.projectid)
    };
    Ok(Json(json!({
        "new_status": joined,
        "message": message,
        "projects": projects,
    }))
    .into_response())
}

pub async fn list_projects(
    State((engine, _, _)): State<AppState>,
    Query(query): Query<ProjectsQuery>,
) -> AppResult<Response> {
    let projects = engine.projects(query.user.as_deref()).await?;
    Ok(Json(projects).into_response())
}
