// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex as PlMutex;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::context::ActorContext;
use super::error::ActorError;
use super::traits::ActorInstance;
use crate::dispatch::{DispatchError, MethodDispatcher};
use crate::dlq::{DeadLetter, DeadLetterQueue};
use crate::mailbox::{Mailbox, MailboxOptions, MessageHandler, PostError};
use crate::message::{CallError, Envelope};
use crate::util::{ActorKey, MessageId};

/// A runtime instance of one actor identity on its owning silo.
///
/// Owns the instance, its dispatcher, the mailbox and the responder table
/// that routes each turn's outcome back to the waiting caller. At most
/// one activation exists per identity per silo; the silo's resolve path
/// guarantees that.
pub struct Activation {
    key: ActorKey,
    instance: Mutex<Box<dyn ActorInstance>>,
    dispatcher: Arc<dyn MethodDispatcher>,
    mailbox: Mailbox,
    responders: DashMap<MessageId, oneshot::Sender<Envelope>>,
    dlq: Arc<DeadLetterQueue>,
    seed_metadata: HashMap<String, String>,
    cancellation: CancellationToken,
    activated_at: DateTime<Utc>,
    last_activity: PlMutex<DateTime<Utc>>,
}

impl Activation {
    /// Run `on_activate`, then start the mailbox consumer.
    ///
    /// The hook completes before any message can be dispatched; a failing
    /// or cancelled hook aborts the activation entirely.
    pub async fn spawn(
        key: ActorKey,
        mut instance: Box<dyn ActorInstance>,
        dispatcher: Arc<dyn MethodDispatcher>,
        mailbox_options: MailboxOptions,
        dlq: Arc<DeadLetterQueue>,
        seed_metadata: HashMap<String, String>,
    ) -> Result<Arc<Self>, ActorError> {
        let cancellation = CancellationToken::new();

        let mut ctx = ActorContext::lifecycle(&key, cancellation.child_token());
        *ctx.metadata_mut() = seed_metadata.clone();
        instance.on_activate(&mut ctx).await?;
        if cancellation.is_cancelled() {
            return Err(ActorError::ActivationFailed("canceled".to_string()));
        }

        debug!(actor = %key, "activation created");
        let activation = Arc::new(Self {
            key,
            instance: Mutex::new(instance),
            dispatcher,
            mailbox: Mailbox::new(mailbox_options),
            responders: DashMap::new(),
            dlq,
            seed_metadata,
            cancellation,
            activated_at: Utc::now(),
            last_activity: PlMutex::new(Utc::now()),
        });
        activation
            .mailbox
            .start(Arc::clone(&activation) as Arc<dyn MessageHandler>);
        Ok(activation)
    }

    /// Post an envelope; the returned receiver resolves with the response
    /// once the turn (including retries) finished.
    pub async fn deliver(
        &self,
        envelope: Envelope,
    ) -> Result<oneshot::Receiver<Envelope>, PostError> {
        let message_id = envelope.message_id;
        let (tx, rx) = oneshot::channel();
        self.responders.insert(message_id, tx);

        match self.mailbox.post(envelope).await {
            Ok(()) => Ok(rx),
            Err(err) => {
                self.responders.remove(&message_id);
                Err(err)
            }
        }
    }

    fn respond(&self, response: Envelope) {
        if let Some((_, tx)) = self.responders.remove(&response.message_id) {
            let _ = tx.send(response);
        }
    }

    fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }

    /// Drain the mailbox, then run `on_deactivate`.
    ///
    /// Cancellation of the hook is honored only here, after the drain;
    /// an activation never disappears with messages still queued.
    pub async fn deactivate(&self) {
        self.mailbox.stop().await;

        let mut ctx = ActorContext::lifecycle(&self.key, self.cancellation.child_token());
        *ctx.metadata_mut() = self.seed_metadata.clone();
        let mut instance = self.instance.lock().await;
        if let Err(err) = instance.on_deactivate(&mut ctx).await {
            warn!(actor = %self.key, error = %err, "on_deactivate failed");
        }
        self.cancellation.cancel();
        debug!(actor = %self.key, "activation destroyed");
    }

    /// The identity this activation serves.
    pub fn key(&self) -> &ActorKey {
        &self.key
    }

    /// When the activation was created.
    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// When the activation last completed a turn.
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    /// The activation's mailbox (counters and state for diagnostics).
    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }
}

#[async_trait]
impl MessageHandler for Activation {
    async fn handle(&self, envelope: &Envelope) -> Result<(), ActorError> {
        let mut ctx = ActorContext::for_envelope(envelope, self.cancellation.child_token());
        ctx.metadata_mut().extend(
            self.seed_metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let result = {
            let mut instance = self.instance.lock().await;
            self.dispatcher
                .invoke(
                    instance.as_mut(),
                    &mut ctx,
                    &envelope.method_name,
                    &envelope.payload,
                )
                .await
        };
        self.touch();

        match result {
            Ok(response_payload) => {
                self.respond(envelope.reply_ok(response_payload));
                Ok(())
            }
            Err(DispatchError::UnknownMethod { actor_type, method }) => {
                self.respond(envelope.reply_err(&CallError::UnknownMethod { actor_type, method }));
                Ok(())
            }
            Err(DispatchError::Malformed(detail)) => {
                warn!(actor = %self.key, method = %envelope.method_name, %detail,
                      "malformed payload");
                self.respond(envelope.reply_err(&CallError::MalformedPayload(detail)));
                Ok(())
            }
            Err(DispatchError::Surface(call_error)) => {
                self.respond(envelope.reply_err(&call_error));
                Ok(())
            }
            // User-code failure: the mailbox loop owns retry and DLQ.
            Err(DispatchError::Failed(message)) => Err(ActorError::Failure(message)),
        }
    }

    async fn on_dead_letter(&self, envelope: &Envelope, error: &ActorError, retry_count: u32) {
        self.dlq.push(DeadLetter {
            envelope: envelope.clone(),
            actor_id: envelope.actor_id.clone(),
            error: error.to_string(),
            enqueued_at: Utc::now(),
            retry_count,
        });
        self.respond(envelope.reply_err(&CallError::ActorFailure(error.to_string())));
    }
}
