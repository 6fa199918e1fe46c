// Layer 1: Standard library imports
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::warn;

// Layer 3: Internal module imports
use super::retry::RetryPolicy;
use crate::message::Envelope;

/// A captured failure: the message, where it was headed and why it died.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The envelope whose invocation kept failing.
    pub envelope: Envelope,

    /// Target actor id.
    pub actor_id: String,

    /// Final error text.
    pub error: String,

    /// When the entry landed in the queue.
    pub enqueued_at: DateTime<Utc>,

    /// Retries performed before giving up.
    pub retry_count: u32,
}

/// Dead-letter settings, overridable per actor type.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DlqOptions {
    /// Whether exhausted messages are captured at all.
    pub enabled: bool,

    /// Queue capacity; oldest entries are evicted beyond it.
    pub max_messages: usize,

    /// Keep the full error text (false truncates to the first line).
    pub capture_stack_traces: bool,

    /// Retry schedule applied before a message dead-letters.
    pub retry: RetryPolicy,
}

impl Default for DlqOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages: 10_000,
            capture_stack_traces: true,
            retry: RetryPolicy::default(),
        }
    }
}

/// Bounded FIFO of failed messages with per-actor-type overrides.
///
/// At capacity the oldest entry is evicted first. Overrides replace the
/// global defaults wholesale for a type; there is no field-level merge.
pub struct DeadLetterQueue {
    defaults: DlqOptions,
    overrides: RwLock<HashMap<String, DlqOptions>>,
    entries: Mutex<VecDeque<DeadLetter>>,
    evicted: AtomicU64,
}

impl DeadLetterQueue {
    /// Create a queue with the given global defaults.
    pub fn new(defaults: DlqOptions) -> Self {
        Self {
            defaults,
            overrides: RwLock::new(HashMap::new()),
            entries: Mutex::new(VecDeque::new()),
            evicted: AtomicU64::new(0),
        }
    }

    /// Replace the options for one actor type.
    pub fn set_override(&self, actor_type: impl Into<String>, options: DlqOptions) {
        self.overrides.write().insert(actor_type.into(), options);
    }

    /// Effective options for an actor type.
    pub fn options_for(&self, actor_type: &str) -> DlqOptions {
        self.overrides
            .read()
            .get(actor_type)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }

    /// Capture a failed message, honoring the type's options.
    ///
    /// Returns whether the entry was stored.
    pub fn push(&self, mut letter: DeadLetter) -> bool {
        let options = self.options_for(&letter.envelope.actor_type);
        if !options.enabled {
            return false;
        }
        if !options.capture_stack_traces {
            if let Some(first_line) = letter.error.lines().next() {
                letter.error = first_line.to_string();
            }
        }

        warn!(actor = %letter.envelope.actor_type, actor_id = %letter.actor_id,
              method = %letter.envelope.method_name, retries = letter.retry_count,
              "message dead-lettered");

        // The capacity in force is the pushing type's (overrides replace
        // the defaults wholesale); eviction is oldest-first regardless of
        // which type the evicted entry belonged to.
        let mut entries = self.entries.lock();
        while entries.len() >= options.max_messages.max(1) {
            entries.pop_front();
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(letter);
        true
    }

    /// Remove and return the oldest entry.
    pub fn pop_oldest(&self) -> Option<DeadLetter> {
        self.entries.lock().pop_front()
    }

    /// Remove and return up to `max` oldest entries, for replay.
    pub fn drain(&self, max: usize) -> Vec<DeadLetter> {
        let mut entries = self.entries.lock();
        let take = max.min(entries.len());
        entries.drain(..take).collect()
    }

    /// Current number of captured entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries evicted to make room since creation.
    pub fn evicted_count(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new(DlqOptions::default())
    }
}
