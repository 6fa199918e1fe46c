//! Persistent reminders: durable timers that wake an activation.

mod scanner;
mod table;
mod types;

pub use scanner::{parse_reminder_payload, reminder_payload, ReminderScanner, REMINDER_METHOD};
pub use table::{InMemoryReminderTable, ReminderError, ReminderTable};
pub use types::Reminder;
