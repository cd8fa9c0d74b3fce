//! Ephemeral user-facing notifications.
//!
//! Entries live in insertion order and carry an optional countdown. The host
//! drives time by calling [`NotificationQueue::tick`] with the elapsed
//! duration; expired entries are removed and their ids returned.
//!
//! Dismissing an entry removes its countdown with it, so a later tick can
//! never remove a different entry. Ids come from a per-queue counter and are
//! never reused.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use roster_core::constants::NOTIFICATION_DURATION_MS;
use roster_core::{Clock, SystemClock};

use crate::config::{DEFAULT_NOTIFICATION_CAPACITY, RosterConfig};

/// Identifier of a queued notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

/// How urgently assistive technology should announce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Politeness {
    /// Announce when the user is idle.
    Polite,
    /// Interrupt and announce immediately.
    Assertive,
}

impl NotificationKind {
    /// Errors interrupt; everything else waits.
    #[must_use]
    pub fn politeness(self) -> Politeness {
        match self {
            Self::Error => Politeness::Assertive,
            Self::Success | Self::Warning | Self::Info => Politeness::Polite,
        }
    }

    /// Display glyph.
    #[must_use]
    pub fn icon(self) -> char {
        match self {
            Self::Success => '\u{2713}', // ✓
            Self::Error => '\u{2717}',   // ✗
            Self::Warning => '!',
            Self::Info => 'i',
        }
    }
}

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Time left before auto-dismissal; `None` stays until dismissed.
    pub remaining: Option<Duration>,
}

impl Notification {
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.remaining.is_none()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining.is_some_and(|r| r.is_zero())
    }
}

/// Bounded, ordered queue of notifications.
pub struct NotificationQueue {
    entries: VecDeque<Notification>,
    next_id: u64,
    default_duration: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(NOTIFICATION_DURATION_MS),
            DEFAULT_NOTIFICATION_CAPACITY,
        )
    }
}

impl NotificationQueue {
    /// A queue with the given auto-dismiss delay and capacity.
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(default_duration: Duration, capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 1,
            default_duration,
            capacity: capacity.max(1),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn from_config(config: &RosterConfig) -> Self {
        Self::new(config.notification_duration, config.notification_capacity)
    }

    /// Stamp `created_at` from `clock` instead of the system clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn default_duration(&self) -> Duration {
        self.default_duration
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue `message` with the default countdown.
    pub fn show(&mut self, kind: NotificationKind, message: impl Into<String>) -> NotificationId {
        self.show_with_duration(kind, message, Some(self.default_duration))
    }

    /// Queue `message` with an explicit countdown; `None` is persistent.
    pub fn show_with_duration(
        &mut self,
        kind: NotificationKind,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> NotificationId {
        let id = NotificationId(self.next_id);
        self.next_id += 1;

        while self.entries.len() >= self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                tracing::debug!(id = %evicted.id, "notification evicted, queue full");
            }
        }

        self.entries.push_back(Notification {
            id,
            kind,
            message: message.into(),
            created_at: self.clock.now(),
            remaining: duration,
        });
        tracing::debug!(id = %id, kind = ?kind, "notification shown");
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> NotificationId {
        self.show(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> NotificationId {
        self.show(NotificationKind::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> NotificationId {
        self.show(NotificationKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> NotificationId {
        self.show(NotificationKind::Info, message)
    }

    /// Remove `id` and its countdown. Returns whether it was present.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        before != self.entries.len()
    }

    /// Advance every countdown by `elapsed` and drop expired entries.
    ///
    /// Returns the removed ids in queue order.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<NotificationId> {
        let mut expired = Vec::new();
        for entry in &mut self.entries {
            if let Some(remaining) = entry.remaining.as_mut() {
                *remaining = remaining.saturating_sub(elapsed);
                if remaining.is_zero() {
                    expired.push(entry.id);
                }
            }
        }
        if !expired.is_empty() {
            self.entries.retain(|n| !n.is_expired());
        }
        expired
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.entries.iter().find(|n| n.id == id)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("entries", &self.entries.len())
            .field("next_id", &self.next_id)
            .field("default_duration", &self.default_duration)
            .field("capacity", &self.capacity)
            .finish()
    }
}
