//! Caller identity passed into every engine operation

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Platform role carried in the caller's access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Mentor,
    Teacher,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Student, Role::Mentor, Role::Teacher, Role::Admin];

    /// Whether this role may create sessions and act as the mentor side
    pub fn can_host_sessions(self) -> bool {
        match self {
            Role::Mentor | Role::Teacher => true,
            Role::Student | Role::Admin => false,
        }
    }

    /// Whether this role may read sessions it does not take part in
    pub fn can_view_any_session(self) -> bool {
        match self {
            Role::Admin => true,
            Role::Student | Role::Mentor | Role::Teacher => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
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
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "mentee" => Ok(Role::Student),
            "mentor" => Ok(Role::Mentor),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Authenticated caller of an engine operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Resolve the caller's role from the token's role claims.
    ///
    /// The first recognised role wins; tokens without one are treated as students.
    pub fn from_claims(id: Uuid, roles: &[String]) -> Self {
        let role = roles
            .iter()
            .find_map(|r| r.parse::<Role>().ok())
            .unwrap_or(Role::Student);
        Self { id, role }
    }
}
