use chrono::Utc;
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::shared::models::{Ticket, TicketComment, TicketPriority, TicketStatus};
use crate::shared::schema::{ticket_comments, tickets, users};
use crate::tickets::policy::TicketScope;

/// List row: ticket plus creator/assignee display names.
#[derive(Debug, Serialize)]
pub struct TicketRow {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub creator_name: Option<String>,
    pub assignee_name: Option<String>,
}

/// Detail row: list row plus the assigner's display name.
#[derive(Debug, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub creator_name: Option<String>,
    pub assignee_name: Option<String>,
    pub assigner_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentRow {
    #[serde(flatten)]
    pub comment: TicketComment,
    pub full_name: Option<String>,
}

pub fn create(
    conn: &mut PgConnection,
    title: &str,
    description: &str,
    category: &str,
    priority: TicketPriority,
    creator_id: Uuid,
) -> QueryResult<Ticket> {
    let ticket = Ticket {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        priority: priority.as_str().to_string(),
        status: TicketStatus::Open.as_str().to_string(),
        created_by: creator_id,
        assigned_to: None,
        assigned_by: None,
        resolution_notes: None,
        created_at: Utc::now(),
        resolved_at: None,
    };

    diesel::insert_into(tickets::table)
        .values(&ticket)
        .execute(conn)?;

    Ok(ticket)
}

/// Tickets visible under the given scope, newest first, with display names
/// resolved in a second lookup query.
pub fn find_all(conn: &mut PgConnection, scope: TicketScope) -> QueryResult<Vec<TicketRow>> {
    let mut query = tickets::table.into_boxed();

    match scope {
        TicketScope::CreatedBy(user_id) => {
            query = query.filter(tickets::created_by.eq(user_id));
        }
        TicketScope::AssignedOrOpen(user_id) => {
            query = query.filter(
                tickets::assigned_to
                    .eq(user_id)
                    .or(tickets::status.eq(TicketStatus::Open.as_str())),
            );
        }
        TicketScope::All => {}
    }

    let rows: Vec<Ticket> = query.order(tickets::created_at.desc()).load(conn)?;

    let user_ids: Vec<Uuid> = rows
        .iter()
        .flat_map(|t| [Some(t.created_by), t.assigned_to])
        .flatten()
        .collect();
    let names = display_names(conn, user_ids)?;

    Ok(rows
        .into_iter()
        .map(|ticket| {
            let creator_name = names.get(&ticket.created_by).cloned();
            let assignee_name = ticket.assigned_to.and_then(|id| names.get(&id).cloned());
            TicketRow {
                ticket,
                creator_name,
                assignee_name,
            }
        })
        .collect())
}

/// Raw ticket row, for permission checks before a mutation.
pub fn fetch(conn: &mut PgConnection, ticket_id: Uuid) -> QueryResult<Option<Ticket>> {
    tickets::table.find(ticket_id).first(conn).optional()
}

pub fn exists(conn: &mut PgConnection, ticket_id: Uuid) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(tickets::table.find(ticket_id))).get_result(conn)
}

pub fn find_by_id(conn: &mut PgConnection, ticket_id: Uuid) -> QueryResult<Option<TicketDetail>> {
    let Some(ticket) = fetch(conn, ticket_id)? else {
        return Ok(None);
    };

    let user_ids: Vec<Uuid> = [Some(ticket.created_by), ticket.assigned_to, ticket.assigned_by]
        .into_iter()
        .flatten()
        .collect();
    let names = display_names(conn, user_ids)?;

    let creator_name = names.get(&ticket.created_by).cloned();
    let assignee_name = ticket.assigned_to.and_then(|id| names.get(&id).cloned());
    let assigner_name = ticket.assigned_by.and_then(|id| names.get(&id).cloned());

    Ok(Some(TicketDetail {
        ticket,
        creator_name,
        assignee_name,
        assigner_name,
    }))
}

/// Bind a ticket to an assignee. One UPDATE sets assignee, assigner, and
/// status together, so the both-or-neither invariant cannot be half-applied.
/// Returns false when the ticket id matches no row.
pub fn assign(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    assignee_id: Uuid,
    assigner_id: Uuid,
) -> QueryResult<bool> {
    let affected = diesel::update(tickets::table.find(ticket_id))
        .set((
            tickets::assigned_to.eq(Some(assignee_id)),
            tickets::assigned_by.eq(Some(assigner_id)),
            tickets::status.eq(TicketStatus::Assigned.as_str()),
        ))
        .execute(conn)?;

    Ok(affected > 0)
}

/// Store a status transition. Resolution stamps resolved-at and the notes in
/// the same UPDATE; callers enforce that notes are present for `Resolved`.
pub fn update_status(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    status: TicketStatus,
    resolution_notes: Option<&str>,
) -> QueryResult<bool> {
    let affected = match (status, resolution_notes) {
        (TicketStatus::Resolved, Some(notes)) => {
            diesel::update(tickets::table.find(ticket_id))
                .set((
                    tickets::status.eq(status.as_str()),
                    tickets::resolution_notes.eq(Some(notes)),
                    tickets::resolved_at.eq(Some(Utc::now())),
                ))
                .execute(conn)?
        }
        _ => diesel::update(tickets::table.find(ticket_id))
            .set(tickets::status.eq(status.as_str()))
            .execute(conn)?,
    };

    Ok(affected > 0)
}

pub fn add_comment(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    user_id: Uuid,
    body: &str,
) -> QueryResult<TicketComment> {
    let comment = TicketComment {
        id: Uuid::new_v4(),
        ticket_id,
        user_id,
        comment: body.to_string(),
        created_at: Utc::now(),
    };

    diesel::insert_into(ticket_comments::table)
        .values(&comment)
        .execute(conn)?;

    Ok(comment)
}

/// Comments on a ticket, oldest first, with author display names.
pub fn comments(conn: &mut PgConnection, ticket_id: Uuid) -> QueryResult<Vec<CommentRow>> {
    let rows: Vec<TicketComment> = ticket_comments::table
        .filter(ticket_comments::ticket_id.eq(ticket_id))
        .order(ticket_comments::created_at.asc())
        .load(conn)?;

    let user_ids: Vec<Uuid> = rows.iter().map(|c| c.user_id).collect();
    let names = display_names(conn, user_ids)?;

    Ok(rows
        .into_iter()
        .map(|comment| {
            let full_name = names.get(&comment.user_id).cloned();
            CommentRow { comment, full_name }
        })
        .collect())
}

fn display_names(
    conn: &mut PgConnection,
    user_ids: Vec<Uuid>,
) -> QueryResult<HashMap<Uuid, String>> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let pairs: Vec<(Uuid, String)> = users::table
        .filter(users::id.eq_any(user_ids))
        .select((users::id, users::full_name))
        .load(conn)?;

    Ok(pairs.into_iter().collect())
}
