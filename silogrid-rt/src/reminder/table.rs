// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

// Layer 3: Internal module imports
use super::types::Reminder;

/// Reminder store failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReminderError {
    /// Provider-specific failure.
    #[error("reminder store backend error: {0}")]
    Backend(String),
}

/// Durable reminder store keyed by `(actor_id, name)`.
#[async_trait]
pub trait ReminderTable: Send + Sync + 'static {
    /// Register or replace a reminder.
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError>;

    /// Remove a reminder. Returns whether one existed.
    async fn unregister(&self, actor_id: &str, name: &str) -> Result<bool, ReminderError>;

    /// Fetch one reminder.
    async fn get(&self, actor_id: &str, name: &str) -> Result<Option<Reminder>, ReminderError>;

    /// All reminders with `next_fire_time <= as_of`.
    async fn due(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError>;

    /// Record a firing: reschedule to `next`, or remove when `None`.
    async fn complete_firing(
        &self,
        actor_id: &str,
        name: &str,
        fired_at: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<(), ReminderError>;
}

/// In-memory reminder table.
#[derive(Debug, Default)]
pub struct InMemoryReminderTable {
    rows: DashMap<(String, String), Reminder>,
}

impl InMemoryReminderTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered reminders.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no reminder is registered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl ReminderTable for InMemoryReminderTable {
    async fn register(&self, reminder: Reminder) -> Result<(), ReminderError> {
        self.rows.insert(
            (reminder.actor_id.clone(), reminder.name.clone()),
            reminder,
        );
        Ok(())
    }

    async fn unregister(&self, actor_id: &str, name: &str) -> Result<bool, ReminderError> {
        Ok(self
            .rows
            .remove(&(actor_id.to_string(), name.to_string()))
            .is_some())
    }

    async fn get(&self, actor_id: &str, name: &str) -> Result<Option<Reminder>, ReminderError> {
        Ok(self
            .rows
            .get(&(actor_id.to_string(), name.to_string()))
            .map(|r| r.clone()))
    }

    async fn due(&self, as_of: DateTime<Utc>) -> Result<Vec<Reminder>, ReminderError> {
        let mut due: Vec<Reminder> = self
            .rows
            .iter()
            .filter(|r| r.is_due(as_of))
            .map(|r| r.clone())
            .collect();
        due.sort_by_key(|r| r.next_fire_time);
        Ok(due)
    }

    async fn complete_firing(
        &self,
        actor_id: &str,
        name: &str,
        fired_at: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<(), ReminderError> {
        let key = (actor_id.to_string(), name.to_string());
        match next {
            Some(next_fire_time) => {
                if let Some(mut row) = self.rows.get_mut(&key) {
                    row.last_fired_at = Some(fired_at);
                    row.next_fire_time = next_fire_time;
                }
            }
            None => {
                self.rows.remove(&key);
            }
        }
        Ok(())
    }
}
