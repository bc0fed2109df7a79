//! Typing indicators
//!
//! Time is passed in explicitly so expiry is deterministic under test.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chat_core::Snowflake;

/// Clears remote typing indicators that were not renewed within the window
#[derive(Debug)]
pub struct TypingWatchdog {
    window: Duration,
    deadlines: HashMap<(Snowflake, Snowflake), Instant>,
}

impl TypingWatchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadlines: HashMap::new(),
        }
    }

    /// `user_typing` received; starts or renews the indicator
    pub fn start(&mut self, chat_id: Snowflake, user_id: Snowflake, now: Instant) {
        self.deadlines.insert((chat_id, user_id), now + self.window);
    }

    /// `user_stop_typing` received; returns whether the user was typing
    pub fn stop(&mut self, chat_id: Snowflake, user_id: Snowflake) -> bool {
        self.deadlines.remove(&(chat_id, user_id)).is_some()
    }

    /// Drop indicators whose window elapsed; returns the cleared pairs
    pub fn expire(&mut self, now: Instant) -> Vec<(Snowflake, Snowflake)> {
        let mut cleared: Vec<_> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, _)| *key)
            .collect();
        for key in &cleared {
            self.deadlines.remove(key);
        }
        cleared.sort_unstable();
        cleared
    }

    pub fn is_typing(&self, chat_id: Snowflake, user_id: Snowflake, now: Instant) -> bool {
        self.deadlines
            .get(&(chat_id, user_id))
            .is_some_and(|deadline| *deadline > now)
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}

/// Outgoing signal decided by [`LocalTyping`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignalKind {
    Start,
    Stop,
}

/// The local user's typing state
///
/// Emits `Start` on the first keystroke and `Stop` once input has been idle
/// for the configured window.
#[derive(Debug)]
pub struct LocalTyping {
    idle: Duration,
    last_input: Option<Instant>,
}

impl LocalTyping {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            last_input: None,
        }
    }

    pub fn is_typing(&self) -> bool {
        self.last_input.is_some()
    }

    /// A keystroke happened
    pub fn input(&mut self, now: Instant) -> Option<TypingSignalKind> {
        let started = self.last_input.is_none();
        self.last_input = Some(now);
        started.then_some(TypingSignalKind::Start)
    }

    /// Check the idle window
    pub fn poll(&mut self, now: Instant) -> Option<TypingSignalKind> {
        let last = self.last_input?;
        if now.saturating_duration_since(last) >= self.idle {
            self.last_input = None;
            Some(TypingSignalKind::Stop)
        } else {
            None
        }
    }

    /// Stop immediately, e.g. after sending or on close
    pub fn stop(&mut self) -> Option<TypingSignalKind> {
        self.last_input.take().map(|_| TypingSignalKind::Stop)
    }
}
