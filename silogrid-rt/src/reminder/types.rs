// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// A durable timer keyed by `(actor_id, name)`.
///
/// Fires as a synthetic envelope to the owning activation. One-shot
/// reminders (no `period`) are removed after firing; repeating reminders
/// reschedule `next_fire_time = fired_at + period`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    /// Target actor id.
    pub actor_id: String,

    /// Target actor type.
    pub actor_type: String,

    /// Name, unique per actor id.
    pub name: String,

    /// First due time.
    pub due_time: DateTime<Utc>,

    /// Repeat interval, if any.
    pub period: Option<Duration>,

    /// Opaque payload handed back to the actor on every firing.
    pub data: Bytes,

    /// Last successful firing.
    pub last_fired_at: Option<DateTime<Utc>>,

    /// Next scheduled firing.
    pub next_fire_time: DateTime<Utc>,
}

impl Reminder {
    /// One-shot reminder.
    pub fn once(
        actor_type: impl Into<String>,
        actor_id: impl Into<String>,
        name: impl Into<String>,
        due_time: DateTime<Utc>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_type: actor_type.into(),
            name: name.into(),
            due_time,
            period: None,
            data: Bytes::new(),
            last_fired_at: None,
            next_fire_time: due_time,
        }
    }

    /// Repeating reminder.
    pub fn repeating(
        actor_type: impl Into<String>,
        actor_id: impl Into<String>,
        name: impl Into<String>,
        due_time: DateTime<Utc>,
        period: Duration,
    ) -> Self {
        let mut reminder = Self::once(actor_type, actor_id, name, due_time);
        reminder.period = Some(period);
        reminder
    }

    /// Builder method: attach payload data.
    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    /// Whether the reminder is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_fire_time <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_once_fires_at_due_time() {
        let due = Utc::now() + chrono::Duration::seconds(60);
        let reminder = Reminder::once("Order", "o1", "follow-up", due);

        assert_eq!(reminder.next_fire_time, due);
        assert!(reminder.period.is_none());
        assert!(!reminder.is_due(Utc::now()));
        assert!(reminder.is_due(due));
    }

    #[test]
    fn test_repeating_carries_period() {
        let due = Utc::now();
        let reminder =
            Reminder::repeating("Order", "o1", "tick", due, Duration::from_secs(30))
                .with_data(Bytes::from_static(b"ctx"));

        assert_eq!(reminder.period, Some(Duration::from_secs(30)));
        assert_eq!(reminder.data, Bytes::from_static(b"ctx"));
        assert!(reminder.is_due(Utc::now()));
    }
}
