use axum::{extract::State, routing::get, Json, Router};
use diesel::prelude::*;
use std::sync::Arc;

use crate::error::ApiError;
use crate::security::CurrentUser;
use crate::shared::models::{Role, UserIdentity};
use crate::shared::schema::users;
use crate::shared::state::AppState;
use crate::tickets::policy;

/// Assignment candidates for the team-lead assignment dropdown.
pub async fn list_it_staff(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<UserIdentity>>, ApiError> {
    policy::require_team_lead(user.role)?;

    let mut conn = state.conn.get()?;
    let staff: Vec<UserIdentity> = users::table
        .filter(users::role.eq(Role::ItStaff.as_str()))
        .order(users::full_name.asc())
        .select((
            users::id,
            users::username,
            users::email,
            users::full_name,
            users::role,
        ))
        .load(&mut conn)?;

    Ok(Json(staff))
}

pub async fn current_user(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<UserIdentity>, ApiError> {
    let mut conn = state.conn.get()?;

    let identity: Option<UserIdentity> = users::table
        .find(user.id)
        .select((
            users::id,
            users::username,
            users::email,
            users::full_name,
            users::role,
        ))
        .first(&mut conn)
        .optional()?;

    identity.map(Json).ok_or(ApiError::NotFound("user"))
}

pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/it-staff", get(list_it_staff))
        .route("/api/users/me", get(current_user))
}
