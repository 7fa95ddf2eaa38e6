//! Role-based access rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Auditor,
    Worker,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Auditor => "auditor",
            Role::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "auditor" => Ok(Role::Auditor),
            "worker" => Ok(Role::Worker),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Record types any signed-in worker may raise.
const SUBMISSION_TYPES: &[&str] = &[
    "incident",
    "nonconformity",
    "hazard",
    "near-miss",
    "improvement-opportunity",
];

/// Record types a manager may delete without owning them.
const MANAGER_RESOURCES: &[&str] = &[
    "audit",
    "management-review",
    "objective",
    "policy",
    "procedure",
];

fn is_submission_type(kind: &str) -> bool {
    SUBMISSION_TYPES.contains(&kind.to_ascii_lowercase().as_str())
}

fn is_manager_resource(kind: &str) -> bool {
    MANAGER_RESOURCES.contains(&kind.to_ascii_lowercase().as_str())
}

/// A record being acted on: its type and the id of the user who created it.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub kind: &'a str,
    pub owner_id: Option<i64>,
}

impl<'a> Resource<'a> {
    pub fn new(kind: &'a str, owner_id: Option<i64>) -> Self {
        Self { kind, owner_id }
    }
}

pub fn can_create(role: Role, kind: &str) -> bool {
    match role {
        Role::Admin | Role::Manager => true,
        Role::Auditor => false,
        Role::Worker => is_submission_type(kind),
    }
}

pub fn can_edit(role: Role, user_id: i64, resource: Resource<'_>) -> bool {
    match role {
        Role::Admin | Role::Manager => true,
        Role::Auditor => false,
        Role::Worker => resource.owner_id == Some(user_id) || is_submission_type(resource.kind),
    }
}

pub fn can_delete(role: Role, user_id: i64, resource: Resource<'_>) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager => resource.owner_id == Some(user_id) || is_manager_resource(resource.kind),
        Role::Auditor | Role::Worker => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rules() {
        assert!(can_create(Role::Admin, "risk"));
        assert!(can_create(Role::Manager, "audit"));
        assert!(!can_create(Role::Auditor, "incident"));
        assert!(can_create(Role::Worker, "incident"));
        assert!(can_create(Role::Worker, "Near-Miss"));
        assert!(!can_create(Role::Worker, "risk"));
    }

    #[test]
    fn edit_rules() {
        assert!(can_edit(Role::Manager, 1, Resource::new("risk", Some(9))));
        assert!(!can_edit(Role::Auditor, 1, Resource::new("risk", Some(1))));
        assert!(can_edit(Role::Worker, 1, Resource::new("risk", Some(1))));
        assert!(!can_edit(Role::Worker, 1, Resource::new("risk", Some(2))));
        assert!(can_edit(Role::Worker, 1, Resource::new("hazard", None)));
    }

    #[test]
    fn delete_rules() {
        assert!(can_delete(Role::Admin, 1, Resource::new("risk", None)));
        assert!(can_delete(Role::Manager, 1, Resource::new("audit", None)));
        assert!(can_delete(Role::Manager, 1, Resource::new("risk", Some(1))));
        assert!(!can_delete(Role::Manager, 1, Resource::new("risk", Some(2))));
        assert!(!can_delete(Role::Worker, 1, Resource::new("incident", Some(1))));
        assert!(!can_delete(Role::Auditor, 1, Resource::new("audit", None)));
    }

    #[test]
    fn role_parsing() {
        assert_eq!("auditor".parse::<Role>().unwrap(), Role::Auditor);
        assert!("root".parse::<Role>().is_err());
    }
}
