/// Acting identity as supplied by the identity collaborator
///
/// Authentication happens upstream; this crate only consumes the resolved
/// display name and privilege flag.
use crate::error::{PipelineError, PipelineResult};
use crate::models::User;
use serde::{Deserialize, Serialize};

/// User role levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Submits challenges and ideas
    #[default]
    Member,
    /// Reviews submissions and manages the board
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> PipelineResult<Self> {
        match s.to_lowercase().as_str() {
            "member" | "user" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(PipelineError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

/// Resolved caller identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub privileged: bool,
}

impl Actor {
    pub fn new(name: impl Into<String>, privileged: bool) -> Self {
        Self {
            name: name.into(),
            privileged,
        }
    }

    pub fn member(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn admin(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.name.clone(), user.role >= Role::Admin)
    }
}
