pub mod policy;
pub mod store;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::CurrentUser;
use crate::shared::models::{Role, TicketPriority, TicketStatus};
use crate::shared::schema::users;
use crate::shared::state::AppState;
use crate::tickets::store::{CommentRow, TicketDetail, TicketRow};
use diesel::prelude::*;

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub message: String,
    #[serde(rename = "ticketId")]
    pub ticket_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddCommentResponse {
    pub message: String,
    #[serde(rename = "commentId")]
    pub comment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TicketWithComments {
    #[serde(flatten)]
    pub ticket: TicketDetail,
    pub comments: Vec<CommentRow>,
}

fn required<'a>(value: &'a Option<String>) -> Option<&'a str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<Vec<TicketRow>>, ApiError> {
    let scope = policy::list_scope(user.role, user.id);

    let mut conn = state.conn.get()?;
    let rows = store::find_all(&mut conn, scope)?;

    Ok(Json(rows))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketWithComments>, ApiError> {
    let mut conn = state.conn.get()?;

    let ticket = store::find_by_id(&mut conn, id)?.ok_or(ApiError::NotFound("ticket"))?;
    let comments = store::comments(&mut conn, id)?;

    Ok(Json(TicketWithComments { ticket, comments }))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<CreateTicketResponse>), ApiError> {
    let (Some(title), Some(description), Some(category)) = (
        required(&req.title),
        required(&req.description),
        required(&req.category),
    ) else {
        return Err(ApiError::validation(
            "title, description, and category are required",
        ));
    };

    let priority = match required(&req.priority) {
        Some(p) => p
            .parse::<TicketPriority>()
            .map_err(|_| ApiError::validation("unknown priority"))?,
        None => TicketPriority::default(),
    };

    let mut conn = state.conn.get()?;
    let ticket = store::create(&mut conn, title, description, category, priority, user.id)?;

    info!(ticket_id = %ticket.id, creator = %user.username, "ticket created");

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            message: "Ticket created successfully".to_string(),
            ticket_id: ticket.id,
        }),
    ))
}

pub async fn assign_ticket(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignTicketRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    policy::require_team_lead(user.role)?;

    let assignee_id = req
        .assigned_to
        .ok_or_else(|| ApiError::validation("assignee id required"))?;

    let mut conn = state.conn.get()?;

    let assignee_role: Option<String> = users::table
        .find(assignee_id)
        .select(users::role)
        .first(&mut conn)
        .optional()?;
    let assignee_role = assignee_role.ok_or(ApiError::NotFound("assignee"))?;
    if assignee_role.parse::<Role>() != Ok(Role::ItStaff) {
        return Err(ApiError::validation("assignee must be IT staff"));
    }

    if !store::assign(&mut conn, id, assignee_id, user.id)? {
        return Err(ApiError::NotFound("ticket"));
    }

    info!(ticket_id = %id, assignee = %assignee_id, assigner = %user.username, "ticket assigned");

    Ok(Json(MessageResponse {
        message: "Ticket assigned successfully".to_string(),
    }))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let status = required(&req.status)
        .ok_or_else(|| ApiError::validation("status is required"))?
        .parse::<TicketStatus>()
        .map_err(|_| ApiError::validation("unknown status"))?;

    let mut conn = state.conn.get()?;

    let ticket = store::fetch(&mut conn, id)?.ok_or(ApiError::NotFound("ticket"))?;
    policy::authorize_status_update(user.role, user.id, &ticket)?;

    let notes = match status {
        TicketStatus::Resolved => Some(required(&req.resolution_notes).ok_or_else(|| {
            ApiError::validation("resolution notes are required to resolve a ticket")
        })?),
        _ => None,
    };

    if !store::update_status(&mut conn, id, status, notes)? {
        return Err(ApiError::NotFound("ticket"));
    }

    info!(ticket_id = %id, status = status.as_str(), actor = %user.username, "ticket status updated");

    Ok(Json(MessageResponse {
        message: "Ticket status updated successfully".to_string(),
    }))
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddCommentRequest>,
) -> Result<(StatusCode, Json<AddCommentResponse>), ApiError> {
    let body = required(&req.comment).ok_or_else(|| ApiError::validation("comment is required"))?;

    let mut conn = state.conn.get()?;

    if !store::exists(&mut conn, id)? {
        return Err(ApiError::NotFound("ticket"));
    }

    let comment = store::add_comment(&mut conn, id, user.id, body)?;

    Ok((
        StatusCode::CREATED,
        Json(AddCommentResponse {
            message: "Comment added successfully".to_string(),
            comment_id: comment.id,
        }),
    ))
}

pub fn configure_ticket_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_ticket))
        .route("/api/tickets/:id/assign", put(assign_ticket))
        .route("/api/tickets/:id/status", put(update_status))
        .route("/api/tickets/:id/comments", post(add_comment))
}
