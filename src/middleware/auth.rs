use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::AppState;

/// Verified username of the caller, injected by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Identity(pub String);

pub async fn require_auth(
    State((_, auth, _)): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path();

    if path == "/" || path == "/login" || path == "/register" {
        return next.run(req).await;
    }

    let Some(token) = bearer_token(&req) else {
        return AppError::Unauthorized("missing bearer token".into()).into_response();
    };

    match auth.verify(token).await {
        Ok(username) => {
            req.extensions_mut().insert(Identity(username));
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
