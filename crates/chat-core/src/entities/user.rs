//! User entity - the display side of an account
//!
//! Accounts are provisioned elsewhere; this system only reads the attributes it
//! needs to render a message sender or a chat member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Snowflake,
    pub name: Option<String>,
    pub email: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            email: None,
            image: None,
            created_at: Utc::now(),
        }
    }

    /// Name to show in the UI, falling back to the id
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .map_or_else(|| format!("user-{}", self.id), str::to_string)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Public projection of a user attached to messages and chat members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Snowflake,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl UserSummary {
    /// Placeholder used when the user row cannot be resolved
    pub fn unknown(id: Snowflake) -> Self {
        Self {
            id,
            name: None,
            image: None,
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            image: user.image.clone(),
        }
    }
}
