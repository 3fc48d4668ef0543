//! Reviewer accounts and roles.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, stable reviewer identifier.
pub type ReviewerId = Uuid;

/// Access role of a reviewer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Global view over every article; never receives assignments.
    Admin,
    /// Eligible for allocation; sees only assigned articles.
    Verificator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Verificator => "verificator",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "verificator" => Ok(Self::Verificator),
            other => Err(format!(
                "unsupported role `{other}`; expected admin|verificator"
            )),
        }
    }
}

/// Registered reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reviewer {
    pub id: ReviewerId,
    pub username: String,
    pub role: Role,
}

impl Reviewer {
    /// Creates a reviewer with a generated stable ID.
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("VERIFICATOR".parse::<Role>(), Ok(Role::Verificator));
        assert!("owner".parse::<Role>().unwrap_err().contains("unsupported role"));
    }
}
