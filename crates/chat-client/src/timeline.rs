//! Conversation timeline
//!
//! Confirmed messages are keyed by their permanent id, so a message that
//! arrives twice (broadcast and history refresh) is stored once. Pending sends
//! are keyed by nonce and are removed the moment their confirmed form lands,
//! so one send is never shown in both forms. Only messages sent by the
//! timeline's owner can settle one of its sends.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use chat_core::protocol::MessagePayload;
use chat_core::Snowflake;

/// How many timed-out nonces are remembered for late confirmations
const EXPIRED_NONCES: usize = 64;

/// An optimistic send awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub nonce: String,
    pub content: String,
    pub sent_at: Instant,
}

/// One row of the rendered conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEntry<'a> {
    Confirmed(&'a MessagePayload),
    Pending(&'a PendingMessage),
}

impl TimelineEntry<'_> {
    pub fn content(&self) -> &str {
        match self {
            Self::Confirmed(m) => &m.content,
            Self::Pending(p) => &p.content,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// What `confirm` did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Replaced the pending entry with the same nonce
    Reconciled,
    /// Confirmed a send that had already timed out
    Recovered,
    /// Not one of ours, or its pending entry was already gone
    Inserted,
    /// Already present
    Duplicate,
}

#[derive(Debug)]
pub struct Timeline {
    owner: Snowflake,
    confirmed: BTreeMap<Snowflake, MessagePayload>,
    pending: Vec<PendingMessage>,
    expired: VecDeque<String>,
}

impl Timeline {
    /// Timeline of sends made by `owner`
    pub fn new(owner: Snowflake) -> Self {
        Self {
            owner,
            confirmed: BTreeMap::new(),
            pending: Vec::new(),
            expired: VecDeque::new(),
        }
    }

    /// Confirmed messages oldest first, then pending sends in send order
    pub fn entries(&self) -> impl Iterator<Item = TimelineEntry<'_>> {
        self.confirmed
            .values()
            .map(TimelineEntry::Confirmed)
            .chain(self.pending.iter().map(TimelineEntry::Pending))
    }

    pub fn push_pending(
        &mut self,
        nonce: impl Into<String>,
        content: impl Into<String>,
        now: Instant,
    ) {
        self.pending.push(PendingMessage {
            nonce: nonce.into(),
            content: content.into(),
            sent_at: now,
        });
    }

    /// Record a persisted message
    pub fn confirm(&mut self, message: MessagePayload) -> Confirmation {
        let own_nonce = message
            .nonce
            .as_deref()
            .filter(|_| message.sender_id == self.owner);
        let reconciled = own_nonce.and_then(|nonce| self.take_pending(nonce)).is_some();
        let recovered = !reconciled && own_nonce.is_some_and(|nonce| self.take_expired(nonce));

        if self.confirmed.contains_key(&message.id) && !recovered {
            return Confirmation::Duplicate;
        }
        self.confirmed.entry(message.id).or_insert(message);

        if reconciled {
            Confirmation::Reconciled
        } else if recovered {
            Confirmation::Recovered
        } else {
            Confirmation::Inserted
        }
    }

    /// Merge a page of history
    ///
    /// Returns how many messages were new and the nonces of timed-out sends
    /// the page turned out to contain.
    pub fn merge_history(
        &mut self,
        messages: impl IntoIterator<Item = MessagePayload>,
    ) -> (usize, Vec<String>) {
        let mut added = 0;
        let mut recovered = Vec::new();
        for message in messages {
            let nonce = message.nonce.clone();
            match self.confirm(message) {
                Confirmation::Duplicate => {}
                Confirmation::Recovered => {
                    added += 1;
                    recovered.extend(nonce);
                }
                Confirmation::Reconciled | Confirmation::Inserted => added += 1,
            }
        }
        (added, recovered)
    }

    /// Roll back a pending send
    pub fn fail(&mut self, nonce: &str) -> Option<PendingMessage> {
        self.take_pending(nonce)
    }

    /// Roll back every send older than `timeout`
    ///
    /// Their nonces are remembered so a confirmation arriving afterwards is
    /// reported as [`Confirmation::Recovered`].
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<PendingMessage> {
        let (expired, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| now.saturating_duration_since(p.sent_at) >= timeout);
        self.pending = kept;
        for pending in &expired {
            if self.expired.len() == EXPIRED_NONCES {
                self.expired.pop_front();
            }
            self.expired.push_back(pending.nonce.clone());
        }
        expired
    }

    pub fn is_pending(&self, nonce: &str) -> bool {
        self.pending.iter().any(|p| p.nonce == nonce)
    }

    pub fn contains(&self, id: Snowflake) -> bool {
        self.confirmed.contains_key(&id)
    }

    pub fn oldest_id(&self) -> Option<Snowflake> {
        self.confirmed.keys().next().copied()
    }

    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_pending(&mut self, nonce: &str) -> Option<PendingMessage> {
        let index = self.pending.iter().position(|p| p.nonce == nonce)?;
        Some(self.pending.remove(index))
    }

    fn take_expired(&mut self, nonce: &str) -> bool {
        let Some(index) = self.expired.iter().position(|n| n == nonce) else {
            return false;
        };
        self.expired.remove(index);
        true
    }
}
