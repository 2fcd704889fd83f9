use std::sync::Arc;

use bcrypt::{hash, verify};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::{AppError, AppResult};
use crate::services::Store;

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

/// Registration, login, and bearer-token lifecycle. Tokens are opaque v4
/// uuids persisted in the store with a TTL; verifying one returns the bound
/// username.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
    token_ttl_secs: u64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, config: &AuthConfig) -> Self {
        Self {
            store,
            bcrypt_cost: config.bcrypt_cost,
            token_ttl_secs: config.token_ttl_secs,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<String> {
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(AppError::Validation(format!(
                "username must be at least {} characters",
                MIN_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = crate::models::User {
            username: username.to_string(),
            password_hash: hash(password.as_bytes(), self.bcrypt_cost)?,
            project_seq: 0,
        };
        if !self.store.insert_user(&user).await? {
            return Err(AppError::Conflict("username already taken".into()));
        }

        tracing::info!("registered user {}", username);
        self.issue_token(username).await
    }

    pub async fn login(&self, username: &str, password: &str) -> AppResult<String> {
        let user = self
            .store
            .get_user(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("username does not exist".into()))?;

        if !verify(password.as_bytes(), &user.password_hash)? {
            tracing::warn!("invalid password for user {}", username);
            return Err(AppError::Unauthorized("password is incorrect".into()));
        }

        tracing::info!("user {} logged in", username);
        self.issue_token(username).await
    }

    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.store.delete_token(token).await?;
        Ok(())
    }

    /// Resolves a bearer token to the username it was issued for.
    pub async fn verify(&self, token: &str) -> AppResult<String> {
        self.store
            .get_token(token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".into()))
    }

    async fn issue_token(&self, username: &str) -> AppResult<String> {
        let token = Uuid::new_v4().to_string();
        self.store
            .put_token(&token, username, self.token_ttl_secs)
            .await?;
        Ok(token)
    }
}
