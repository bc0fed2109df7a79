//! Chat entity - a direct conversation between exactly two users

use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Unordered pair of chat members, stored as `(low, high)`
///
/// Storing the ordered pair under a unique constraint gives at most one chat
/// per pair of users regardless of who opened it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberPair {
    low: Snowflake,
    high: Snowflake,
}

impl MemberPair {
    pub fn new(a: Snowflake, b: Snowflake) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::CannotChatWithSelf);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    #[inline]
    pub fn low(&self) -> Snowflake {
        self.low
    }

    #[inline]
    pub fn high(&self) -> Snowflake {
        self.high
    }

    pub fn contains(&self, user_id: Snowflake) -> bool {
        self.low == user_id || self.high == user_id
    }

    /// The member that is not `user_id`
    pub fn other(&self, user_id: Snowflake) -> Option<Snowflake> {
        if self.low == user_id {
            Some(self.high)
        } else if self.high == user_id {
            Some(self.low)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: Snowflake,
    pub members: MemberPair,
    pub created_at: DateTime<Utc>,
    /// Bumped on every new message
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: Snowflake, members: MemberPair) -> Self {
        let now = Utc::now();
        Self {
            id,
            members,
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn is_member(&self, user_id: Snowflake) -> bool {
        self.members.contains(user_id)
    }

    pub fn member_ids(&self) -> [Snowflake; 2] {
        [self.members.low(), self.members.high()]
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// Membership row, immutable once written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatMember {
    pub chat_id: Snowflake,
    pub user_id: Snowflake,
}

impl ChatMember {
    pub fn new(chat_id: Snowflake, user_id: Snowflake) -> Self {
        Self { chat_id, user_id }
    }
}
