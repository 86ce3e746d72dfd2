use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::password;
use crate::shared::models::{Role, User, UserIdentity};
use crate::shared::schema::users;
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserIdentity,
}

fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (Some(username), Some(plain), Some(email), Some(full_name)) = (
        required(&req.username),
        required(&req.password),
        required(&req.email),
        required(&req.full_name),
    ) else {
        return Err(ApiError::validation(
            "username, password, email, and full_name are required",
        ));
    };

    let role = match required(&req.role) {
        Some(r) => r
            .parse::<Role>()
            .map_err(|_| ApiError::validation("unknown role"))?,
        None => Role::Employee,
    };

    let password_hash = password::hash_password(plain).map_err(|e| {
        error!("password hashing failed: {e}");
        ApiError::Internal
    })?;

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash,
        full_name: full_name.to_string(),
        role: role.as_str().to_string(),
        created_at: Utc::now(),
    };

    let mut conn = state.conn.get()?;
    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)?;

    info!(username = %user.username, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id: user.id,
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(username), Some(plain)) = (required(&req.username), required(&req.password)) else {
        return Err(ApiError::validation("username and password required"));
    };

    let mut conn = state.conn.get()?;

    let user: Option<User> = users::table
        .filter(users::username.eq(username))
        .first(&mut conn)
        .optional()?;

    let Some(user) = user else {
        warn!(username, "login attempt for unknown user");
        return Err(ApiError::Unauthenticated);
    };

    let valid = password::verify_password(plain, &user.password_hash).map_err(|e| {
        error!("password verification failed: {e}");
        ApiError::Internal
    })?;
    if !valid {
        warn!(username, "login attempt with wrong password");
        return Err(ApiError::Unauthenticated);
    }

    let token = state.tokens.issue(&user).map_err(|e| {
        error!("token issuance failed: {e}");
        ApiError::Internal
    })?;

    info!(username, "login successful");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}
