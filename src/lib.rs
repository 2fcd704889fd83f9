pub mod allocation;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::allocation::AllocationEngine;
use crate::config::Config;
use crate::services::AuthService;

// Application state shared between handlers
pub type AppState = (AllocationEngine, AuthService, Config);

pub fn router(state: AppState) -> Router {
    Router::new()
        // Auth routes
        .route("/", get(handlers::index))
        .route("/login", post(handlers::handle_login))
        .route("/register", post(handlers::handle_register))
        .route("/logout", post(handlers::handle_logout))
        // Hardware routes
        .route(
            "/hardware",
            get(handlers::list_hardware_sets).post(handlers::create_hardware_set),
        )
        .route("/checkout", post(handlers::check_out))
        .route("/checkin", post(handlers::check_in))
        // Project routes
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route("/projects/toggle", post(handlers::toggle_membership))
        // Everything past the auth routes requires a bearer token
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state)
}
