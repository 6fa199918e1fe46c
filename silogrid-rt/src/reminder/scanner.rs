// Layer 1: Standard library imports
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use bytes::Bytes;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::table::ReminderTable;
use super::types::Reminder;
use crate::membership::MembershipRegistry;
use crate::message::{Envelope, FramingError, ParamReader, ParamWriter};
use crate::transport::EnvelopeReceiver;
use crate::util::ActorKey;

/// Method name a reminder firing invokes on the activation.
pub const REMINDER_METHOD: &str = "ReceiveReminder";

/// Frame a reminder firing's payload: `(name, data)`.
pub fn reminder_payload(name: &str, data: &Bytes) -> Result<Bytes, FramingError> {
    let mut writer = ParamWriter::new();
    writer.push(name.as_bytes())?;
    writer.push(data)?;
    Ok(writer.finish())
}

/// Parse a reminder firing's payload back into `(name, data)`.
pub fn parse_reminder_payload(payload: Bytes) -> Result<(String, Bytes), FramingError> {
    let mut reader = ParamReader::new(payload);
    let name = reader.next()?;
    let data = reader.next()?;
    reader.finish()?;
    Ok((String::from_utf8_lossy(&name).into_owned(), data))
}

/// Periodic sweep firing due reminders owned by the local silo.
///
/// Every tick queries due rows, skips identities the membership ring
/// maps elsewhere, and posts a synthetic [`REMINDER_METHOD`] envelope
/// through the silo's receiver hook. During a membership change a
/// reminder may fire twice or late on different silos; actors are
/// expected to be idempotent via the inbox.
pub struct ReminderScanner {
    table: Arc<dyn ReminderTable>,
    membership: Arc<MembershipRegistry>,
    receiver: Arc<dyn EnvelopeReceiver>,
    scan_interval: Duration,
    cancel: CancellationToken,
}

impl ReminderScanner {
    /// Build a scanner; `start` spawns the sweep loop.
    pub fn new(
        table: Arc<dyn ReminderTable>,
        membership: Arc<MembershipRegistry>,
        receiver: Arc<dyn EnvelopeReceiver>,
        scan_interval: Duration,
    ) -> Self {
        Self {
            table,
            membership,
            receiver,
            scan_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawn the periodic sweep.
    pub fn start(&self) -> JoinHandle<()> {
        let table = Arc::clone(&self.table);
        let membership = Arc::clone(&self.membership);
        let receiver = Arc::clone(&self.receiver);
        let interval = self.scan_interval;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                Self::scan_once(&*table, &membership, &*receiver).await;
            }
        })
    }

    /// Stop the sweep after the current tick.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// One sweep: fire every locally-owned due reminder.
    pub async fn scan_once(
        table: &dyn ReminderTable,
        membership: &MembershipRegistry,
        receiver: &dyn EnvelopeReceiver,
    ) {
        let now = Utc::now();
        let due = match table.due(now).await {
            Ok(due) => due,
            Err(err) => {
                warn!(error = %err, "reminder due query failed");
                return;
            }
        };

        for reminder in due {
            let key = ActorKey::new(&reminder.actor_type, &reminder.actor_id);
            if !membership.is_local_owner(&key) {
                continue;
            }

            Self::fire(table, receiver, &reminder).await;
        }
    }

    async fn fire(table: &dyn ReminderTable, receiver: &dyn EnvelopeReceiver, reminder: &Reminder) {
        let payload = match reminder_payload(&reminder.name, &reminder.data) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(actor = %reminder.actor_id, name = %reminder.name, error = %err,
                      "reminder payload framing failed");
                return;
            }
        };
        let envelope = Envelope::request(
            &reminder.actor_type,
            &reminder.actor_id,
            REMINDER_METHOD,
            payload,
        );

        debug!(actor = %reminder.actor_id, name = %reminder.name, "firing reminder");
        match receiver.on_envelope(envelope).await {
            Some(response) if response.is_error => {
                warn!(actor = %reminder.actor_id, name = %reminder.name,
                      error = ?response.error_message, "reminder invocation failed");
            }
            Some(_) => {}
            None => {
                warn!(actor = %reminder.actor_id, name = %reminder.name,
                      "reminder firing produced no response");
            }
        }

        let fired_at = Utc::now();
        let next = reminder.period.and_then(|p| {
            chrono::Duration::from_std(p)
                .ok()
                .map(|period| fired_at + period)
        });
        if let Err(err) = table
            .complete_firing(&reminder.actor_id, &reminder.name, fired_at, next)
            .await
        {
            warn!(actor = %reminder.actor_id, name = %reminder.name, error = %err,
                  "reminder completion failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::membership::SiloMeta;
    use crate::reminder::InMemoryReminderTable;
    use crate::util::SiloId;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct RecordingReceiver {
        fired: Mutex<Vec<Envelope>>,
    }

    impl RecordingReceiver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                fired: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl EnvelopeReceiver for RecordingReceiver {
        async fn on_envelope(&self, envelope: Envelope) -> Option<Envelope> {
            let response = envelope.reply_ok(Bytes::new());
            self.fired.lock().push(envelope);
            Some(response)
        }
    }

    fn single_silo_membership() -> Arc<MembershipRegistry> {
        let membership = Arc::new(MembershipRegistry::new(SiloId::new("s1")));
        membership.register(SiloMeta::new(SiloId::new("s1"), "127.0.0.1:7400"));
        membership
    }

    #[tokio::test]
    async fn test_payload_roundtrip() {
        let payload = reminder_payload("tick", &Bytes::from_static(b"ctx")).unwrap();
        let (name, data) = parse_reminder_payload(payload).unwrap();

        assert_eq!(name, "tick");
        assert_eq!(data, Bytes::from_static(b"ctx"));
    }

    #[tokio::test]
    async fn test_due_one_shot_fires_and_is_removed() {
        let table = Arc::new(InMemoryReminderTable::new());
        let membership = single_silo_membership();
        let receiver = RecordingReceiver::new();

        table
            .register(
                Reminder::once("Order", "o1", "follow-up", Utc::now())
                    .with_data(Bytes::from_static(b"d")),
            )
            .await
            .unwrap();

        ReminderScanner::scan_once(&*table, &membership, &*receiver).await;

        let fired = receiver.fired.lock();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].method_name, REMINDER_METHOD);
        assert_eq!(fired[0].actor_type, "Order");
        let (name, data) = parse_reminder_payload(fired[0].payload.clone()).unwrap();
        assert_eq!(name, "follow-up");
        assert_eq!(data, Bytes::from_static(b"d"));
        drop(fired);

        assert!(table.get("o1", "follow-up").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repeating_reminder_reschedules() {
        let table = Arc::new(InMemoryReminderTable::new());
        let membership = single_silo_membership();
        let receiver = RecordingReceiver::new();

        table
            .register(Reminder::repeating(
                "Order",
                "o1",
                "tick",
                Utc::now(),
                Duration::from_secs(60),
            ))
            .await
            .unwrap();

        ReminderScanner::scan_once(&*table, &membership, &*receiver).await;

        let row = table.get("o1", "tick").await.unwrap().unwrap();
        assert!(row.last_fired_at.is_some());
        assert!(row.next_fire_time > Utc::now() + chrono::Duration::seconds(50));
        // No longer due: a second sweep fires nothing.
        ReminderScanner::scan_once(&*table, &membership, &*receiver).await;
        assert_eq!(receiver.fired.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_not_due_reminder_is_skipped() {
        let table = Arc::new(InMemoryReminderTable::new());
        let membership = single_silo_membership();
        let receiver = RecordingReceiver::new();

        table
            .register(Reminder::once(
                "Order",
                "o1",
                "later",
                Utc::now() + chrono::Duration::seconds(3600),
            ))
            .await
            .unwrap();

        ReminderScanner::scan_once(&*table, &membership, &*receiver).await;

        assert!(receiver.fired.lock().is_empty());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_foreign_owned_reminder_is_skipped() {
        let table = Arc::new(InMemoryReminderTable::new());
        let membership = single_silo_membership();
        // A second silo takes part of the ring.
        membership.register(SiloMeta::new(SiloId::new("s2"), "127.0.0.1:7401"));
        let receiver = RecordingReceiver::new();

        // Find an id the ring maps away from the local silo.
        let foreign_id = (0..10_000)
            .map(|i| format!("o{i}"))
            .find(|id| !membership.is_local_owner(&ActorKey::new("Order", id)))
            .unwrap();

        table
            .register(Reminder::once("Order", &foreign_id, "r", Utc::now()))
            .await
            .unwrap();

        ReminderScanner::scan_once(&*table, &membership, &*receiver).await;

        // Not ours to fire; the row stays for the owning silo.
        assert!(receiver.fired.lock().is_empty());
        assert!(table.get(&foreign_id, "r").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_started_scanner_fires_on_interval() {
        let table = Arc::new(InMemoryReminderTable::new());
        let membership = single_silo_membership();
        let receiver = RecordingReceiver::new();

        table
            .register(Reminder::once("Order", "o1", "r", Utc::now()))
            .await
            .unwrap();

        let scanner = ReminderScanner::new(
            Arc::clone(&table) as Arc<dyn ReminderTable>,
            membership,
            Arc::clone(&receiver) as Arc<dyn EnvelopeReceiver>,
            Duration::from_millis(10),
        );
        let handle = scanner.start();

        tokio::time::sleep(Duration::from_millis(80)).await;
        scanner.stop();
        handle.await.unwrap();

        assert_eq!(receiver.fired.lock().len(), 1);
    }
}
