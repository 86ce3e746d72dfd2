//! Role-scoped ticket access rules.
//!
//! Visibility and mutation permissions live here as pure functions so they
//! can be tested without a database. The store translates a [`TicketScope`]
//! into a SQL filter; [`TicketScope::permits`] is the same rule evaluated
//! against an in-memory ticket, and the two must agree.

use uuid::Uuid;

use crate::error::ApiError;
use crate::shared::models::{Role, Ticket, TicketStatus};

/// Which tickets a caller may list.
///
/// Single-ticket reads are deliberately unscoped: any authenticated user may
/// fetch any ticket by id, so commenters and leads can follow links shared
/// out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    /// Tickets created by this user.
    CreatedBy(Uuid),
    /// Tickets assigned to this user, plus the unclaimed open pool.
    AssignedOrOpen(Uuid),
    /// Every ticket.
    All,
}

impl TicketScope {
    pub fn permits(&self, ticket: &Ticket) -> bool {
        match *self {
            Self::CreatedBy(user_id) => ticket.created_by == user_id,
            Self::AssignedOrOpen(user_id) => {
                ticket.assigned_to == Some(user_id)
                    || ticket.status == TicketStatus::Open.as_str()
            }
            Self::All => true,
        }
    }
}

pub fn list_scope(role: Role, user_id: Uuid) -> TicketScope {
    match role {
        Role::Employee => TicketScope::CreatedBy(user_id),
        Role::ItStaff => TicketScope::AssignedOrOpen(user_id),
        Role::TeamLead => TicketScope::All,
    }
}

/// Assignment and the IT-staff roster are team-lead operations.
pub fn require_team_lead(role: Role) -> Result<(), ApiError> {
    if role == Role::TeamLead {
        Ok(())
    } else {
        Err(ApiError::Forbidden("team lead role required"))
    }
}

/// Status updates require ownership of the ticket's current stage: IT staff
/// must be the assignee, an employee must be the creator, a team lead may
/// act on any ticket.
pub fn authorize_status_update(
    role: Role,
    user_id: Uuid,
    ticket: &Ticket,
) -> Result<(), ApiError> {
    match role {
        Role::TeamLead => Ok(()),
        Role::ItStaff if ticket.assigned_to == Some(user_id) => Ok(()),
        Role::ItStaff => Err(ApiError::Forbidden("ticket is not assigned to you")),
        Role::Employee if ticket.created_by == user_id => Ok(()),
        Role::Employee => Err(ApiError::Forbidden("not the creator of this ticket")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::prelude::*;

    fn ticket(created_by: Uuid, assigned_to: Option<Uuid>, status: TicketStatus) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            title: "Broken monitor".to_string(),
            description: "Screen flickers on boot".to_string(),
            category: "hardware".to_string(),
            priority: "medium".to_string(),
            status: status.as_str().to_string(),
            created_by,
            assigned_to,
            assigned_by: assigned_to.map(|_| Uuid::new_v4()),
            resolution_notes: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn test_employee_sees_only_own_tickets() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = list_scope(Role::Employee, me);

        assert!(scope.permits(&ticket(me, None, TicketStatus::Open)));
        assert!(scope.permits(&ticket(me, Some(other), TicketStatus::Resolved)));
        assert!(!scope.permits(&ticket(other, Some(me), TicketStatus::Open)));
    }

    #[test]
    fn test_it_staff_sees_assigned_and_open_pool() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = list_scope(Role::ItStaff, me);

        assert!(scope.permits(&ticket(other, Some(me), TicketStatus::InProgress)));
        assert!(scope.permits(&ticket(other, None, TicketStatus::Open)));
        assert!(!scope.permits(&ticket(other, Some(other), TicketStatus::Assigned)));
        assert!(!scope.permits(&ticket(other, None, TicketStatus::Resolved)));
    }

    #[test]
    fn test_team_lead_sees_everything() {
        let scope = list_scope(Role::TeamLead, Uuid::new_v4());
        let other = Uuid::new_v4();

        assert!(scope.permits(&ticket(other, None, TicketStatus::Open)));
        assert!(scope.permits(&ticket(other, Some(other), TicketStatus::Resolved)));
    }

    /// Randomized fixtures: the scope predicate must agree with an
    /// independent statement of the visibility rule for every role.
    #[test]
    fn test_scope_matches_visibility_rule_for_random_fixtures() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let users: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();
        let statuses = [
            TicketStatus::Open,
            TicketStatus::Assigned,
            TicketStatus::InProgress,
            TicketStatus::Resolved,
        ];

        for _ in 0..500 {
            let creator = *users.choose(&mut rng).expect("users not empty");
            let assignee = if rng.gen_bool(0.5) {
                Some(*users.choose(&mut rng).expect("users not empty"))
            } else {
                None
            };
            let status = *statuses.choose(&mut rng).expect("statuses not empty");
            let t = ticket(creator, assignee, status);
            let viewer = *users.choose(&mut rng).expect("users not empty");

            assert_eq!(
                list_scope(Role::Employee, viewer).permits(&t),
                t.created_by == viewer
            );
            assert_eq!(
                list_scope(Role::ItStaff, viewer).permits(&t),
                t.assigned_to == Some(viewer) || status == TicketStatus::Open
            );
            assert!(list_scope(Role::TeamLead, viewer).permits(&t));
        }
    }

    #[test]
    fn test_require_team_lead() {
        assert!(require_team_lead(Role::TeamLead).is_ok());
        assert!(matches!(
            require_team_lead(Role::Employee),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            require_team_lead(Role::ItStaff),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_it_staff_must_be_assignee() {
        let staff = Uuid::new_v4();
        let creator = Uuid::new_v4();

        let mine = ticket(creator, Some(staff), TicketStatus::Assigned);
        assert!(authorize_status_update(Role::ItStaff, staff, &mine).is_ok());

        let someone_elses = ticket(creator, Some(Uuid::new_v4()), TicketStatus::Assigned);
        assert!(matches!(
            authorize_status_update(Role::ItStaff, staff, &someone_elses),
            Err(ApiError::Forbidden(_))
        ));

        let unassigned = ticket(creator, None, TicketStatus::Open);
        assert!(matches!(
            authorize_status_update(Role::ItStaff, staff, &unassigned),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_employee_must_be_creator() {
        let creator = Uuid::new_v4();
        let t = ticket(creator, None, TicketStatus::Open);

        assert!(authorize_status_update(Role::Employee, creator, &t).is_ok());
        assert!(matches!(
            authorize_status_update(Role::Employee, Uuid::new_v4(), &t),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_team_lead_may_update_any_ticket() {
        let t = ticket(Uuid::new_v4(), Some(Uuid::new_v4()), TicketStatus::InProgress);
        assert!(authorize_status_update(Role::TeamLead, Uuid::new_v4(), &t).is_ok());
    }

    /// Lifecycle scenario: employee A creates, lead L assigns to staff S,
    /// S works it, A (the creator) may still update, another employee may not.
    #[test]
    fn test_lifecycle_permissions_scenario() {
        let employee_a = Uuid::new_v4();
        let lead = Uuid::new_v4();
        let staff = Uuid::new_v4();
        let bystander = Uuid::new_v4();

        let open = ticket(employee_a, None, TicketStatus::Open);
        assert!(require_team_lead(Role::TeamLead).is_ok());
        assert!(list_scope(Role::ItStaff, staff).permits(&open));

        let mut assigned = ticket(employee_a, Some(staff), TicketStatus::Assigned);
        assigned.assigned_by = Some(lead);
        assert!(authorize_status_update(Role::ItStaff, staff, &assigned).is_ok());

        let in_progress = ticket(employee_a, Some(staff), TicketStatus::InProgress);
        assert!(authorize_status_update(Role::Employee, employee_a, &in_progress).is_ok());
        assert!(matches!(
            authorize_status_update(Role::Employee, bystander, &in_progress),
            Err(ApiError::Forbidden(_))
        ));
    }
}
