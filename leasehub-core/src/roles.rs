//! Role hierarchy and lead permissions
//!
//! Staff roles rank handler < manager < admin. A handler's profile names
//! its manager; a manager's team is every handler whose profile points
//! back at it.

use bson::{doc, oid::ObjectId, Document};
use thiserror::Error;

/// Role as far as lead permissions are concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleKind {
    Admin,
    Manager,
    Handler,
    /// Any role name outside the hierarchy; treated with the least access.
    Other(String),
}

impl RoleKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "admin" => Self::Admin,
            "manager" => Self::Manager,
            "handler" => Self::Handler,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Self::Other(_) => 0,
            Self::Handler => 1,
            Self::Manager => 2,
            Self::Admin => 3,
        }
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, Self::Handler)
    }
}

/// Staff member acting on a lead
#[derive(Debug, Clone)]
pub struct Requester {
    pub user_id: ObjectId,
    pub role: RoleKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadPolicyError {
    #[error("You do not have permission to assign leads.")]
    CannotAssign,

    #[error("Managers can only assign leads to their own team members.")]
    OutsideTeam,

    #[error("Handlers can only update their own leads")]
    NotOwnLead,

    #[error("Managers can only update leads for their handlers or themselves")]
    NotTeamLead,

    #[error("You do not have permission to update leads.")]
    CannotUpdate,
}

/// May `requester` hand a lead to an agent whose profile reports to
/// `target_manager`?
pub fn check_assignment(
    requester: &Requester,
    target_manager: Option<ObjectId>,
) -> Result<(), LeadPolicyError> {
    match requester.role {
        RoleKind::Admin => Ok(()),
        RoleKind::Manager if target_manager == Some(requester.user_id) => Ok(()),
        RoleKind::Manager => Err(LeadPolicyError::OutsideTeam),
        RoleKind::Handler | RoleKind::Other(_) => Err(LeadPolicyError::CannotAssign),
    }
}

/// May `requester` change the status of a lead owned by `lead_agent`?
/// `team` holds the requester's handlers when the requester is a manager.
pub fn check_status_update(
    requester: &Requester,
    lead_agent: ObjectId,
    team: &[ObjectId],
) -> Result<(), LeadPolicyError> {
    match requester.role {
        RoleKind::Admin => Ok(()),
        RoleKind::Manager if lead_agent == requester.user_id || team.contains(&lead_agent) => {
            Ok(())
        }
        RoleKind::Manager => Err(LeadPolicyError::NotTeamLead),
        RoleKind::Handler if lead_agent == requester.user_id => Ok(()),
        RoleKind::Handler => Err(LeadPolicyError::NotOwnLead),
        RoleKind::Other(_) => Err(LeadPolicyError::CannotUpdate),
    }
}

/// Which leads a requester may list
#[derive(Debug, Clone, PartialEq)]
pub enum LeadScope {
    All,
    Agents(Vec<ObjectId>),
}

impl LeadScope {
    /// Admins see everything, managers their own and their handlers' leads,
    /// everyone else only their own.
    pub fn for_requester(requester: &Requester, team: &[ObjectId]) -> Self {
        match requester.role {
            RoleKind::Admin => Self::All,
            RoleKind::Manager => {
                let mut agents = Vec::with_capacity(team.len() + 1);
                agents.push(requester.user_id);
                agents.extend(team.iter().copied().filter(|id| *id != requester.user_id));
                Self::Agents(agents)
            }
            RoleKind::Handler | RoleKind::Other(_) => Self::Agents(vec![requester.user_id]),
        }
    }

    pub fn filter(&self) -> Document {
        match self {
            Self::All => Document::new(),
            Self::Agents(ids) => doc! { "assignedAgentId": { "$in": ids.clone() } },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requester(role: RoleKind) -> Requester {
        Requester {
            user_id: ObjectId::new(),
            role,
        }
    }

    #[test]
    fn role_names_are_case_insensitive() {
        assert_eq!(RoleKind::from_name(" Manager "), RoleKind::Manager);
        assert_eq!(RoleKind::from_name("ADMIN"), RoleKind::Admin);
        assert_eq!(
            RoleKind::from_name("auditor"),
            RoleKind::Other("auditor".into())
        );
        assert!(RoleKind::Handler.rank() < RoleKind::Manager.rank());
        assert!(RoleKind::Manager.rank() < RoleKind::Admin.rank());
    }

    #[test]
    fn handlers_cannot_assign() {
        let handler = requester(RoleKind::Handler);
        let err = check_assignment(&handler, Some(ObjectId::new())).unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission to assign leads.");
    }

    #[test]
    fn managers_assign_within_team() {
        let manager = requester(RoleKind::Manager);
        assert!(check_assignment(&manager, Some(manager.user_id)).is_ok());
        assert_eq!(
            check_assignment(&manager, Some(ObjectId::new())),
            Err(LeadPolicyError::OutsideTeam)
        );
        assert_eq!(
            check_assignment(&manager, None),
            Err(LeadPolicyError::OutsideTeam)
        );
    }

    #[test]
    fn admins_assign_anyone() {
        assert!(check_assignment(&requester(RoleKind::Admin), None).is_ok());
    }

    #[test]
    fn status_updates() {
        let handler = requester(RoleKind::Handler);
        assert!(check_status_update(&handler, handler.user_id, &[]).is_ok());
        assert_eq!(
            check_status_update(&handler, ObjectId::new(), &[]),
            Err(LeadPolicyError::NotOwnLead)
        );

        let manager = requester(RoleKind::Manager);
        let teammate = ObjectId::new();
        assert!(check_status_update(&manager, teammate, &[teammate]).is_ok());
        assert!(check_status_update(&manager, manager.user_id, &[]).is_ok());
        assert_eq!(
            check_status_update(&manager, ObjectId::new(), &[teammate]),
            Err(LeadPolicyError::NotTeamLead)
        );

        assert!(check_status_update(&requester(RoleKind::Admin), ObjectId::new(), &[]).is_ok());
    }

    #[test]
    fn listing_scope() {
        let manager = requester(RoleKind::Manager);
        let teammate = ObjectId::new();
        let scope = LeadScope::for_requester(&manager, &[teammate]);
        assert_eq!(scope, LeadScope::Agents(vec![manager.user_id, teammate]));
        assert!(scope.filter().contains_key("assignedAgentId"));

        let admin = requester(RoleKind::Admin);
        assert_eq!(LeadScope::for_requester(&admin, &[]), LeadScope::All);
        assert!(LeadScope::All.filter().is_empty());
    }
}
