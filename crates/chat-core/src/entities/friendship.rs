//! Friendship entity
//!
//! Friendships are written by the friend-request workflow (one row per
//! direction). Chat creation only ever reads them.

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Friendship {
    pub user_id: Snowflake,
    pub friend_id: Snowflake,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(user_id: Snowflake, friend_id: Snowflake) -> Self {
        Self {
            user_id,
            friend_id,
            created_at: Utc::now(),
        }
    }

    /// The same friendship seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            user_id: self.friend_id,
            friend_id: self.user_id,
            created_at: self.created_at,
        }
    }

    /// Whether this row links `a` and `b` in either direction
    pub fn links(&self, a: Snowflake, b: Snowflake) -> bool {
        (self.user_id == a && self.friend_id == b) || (self.user_id == b && self.friend_id == a)
    }
}
