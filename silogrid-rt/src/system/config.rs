//! Silo configuration with sensible defaults.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::errors::SiloError;
use crate::dlq::DlqOptions;
use crate::mailbox::MailboxOptions;
use crate::supervisor::SupervisionOptions;
use crate::transport::{ChannelPoolOptions, TransportOptions};
use crate::util::SiloId;

/// Default timeout for graceful silo shutdown (30 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Default reminder sweep interval (30 seconds).
pub const DEFAULT_REMINDER_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// Idle-deactivation ("serverless") tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerlessOptions {
    /// Whether idle activations are deactivated at all.
    pub enabled: bool,

    /// Inactivity age at which an activation becomes collectable.
    pub idle_timeout: Duration,

    /// How often the sweep runs.
    pub check_interval: Duration,

    /// Activations always kept alive, oldest-idle evicted beyond it.
    pub minimum_active_actors: usize,

    /// Hint for actors to load state in `on_activate` rather than lazily
    /// (exposed to actors as context metadata).
    pub eager_state_loading: bool,
}

impl Default for ServerlessOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            idle_timeout: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(60),
            minimum_active_actors: 0,
            eager_state_loading: false,
        }
    }
}

/// Everything a silo can be tuned with.
///
/// Per-actor-type retry overrides live in the dead-letter options; at
/// activation time the effective retry policy for the type replaces the
/// one inside `mailbox`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiloConfig {
    /// Stable member id of this silo.
    pub silo_id: SiloId,

    /// `host:port` the transport listens on.
    pub bind_addr: String,

    /// Deadline for draining activations on shutdown.
    pub shutdown_timeout: Duration,

    /// Mailbox defaults for every activation.
    pub mailbox: MailboxOptions,

    /// Dead-letter defaults (per-actor-type overrides are set on the
    /// queue itself).
    pub dlq: DlqOptions,

    /// Supervision defaults for actors that spawn children.
    pub supervision: SupervisionOptions,

    /// Idle-deactivation behavior.
    pub serverless: ServerlessOptions,

    /// Request-level transport behavior.
    pub transport: TransportOptions,

    /// Peer-connection hygiene.
    pub channel_pool: ChannelPoolOptions,

    /// Reminder sweep interval.
    pub reminder_scan_interval: Duration,
}

impl SiloConfig {
    /// Configuration with defaults for the given identity and address.
    pub fn new(silo_id: SiloId, bind_addr: impl Into<String>) -> Self {
        Self {
            silo_id,
            bind_addr: bind_addr.into(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            mailbox: MailboxOptions::default(),
            dlq: DlqOptions::default(),
            supervision: SupervisionOptions::default(),
            serverless: ServerlessOptions::default(),
            transport: TransportOptions::default(),
            channel_pool: ChannelPoolOptions::default(),
            reminder_scan_interval: DEFAULT_REMINDER_SCAN_INTERVAL,
        }
    }

    /// Start a builder for the given identity and address.
    pub fn builder(silo_id: SiloId, bind_addr: impl Into<String>) -> SiloConfigBuilder {
        SiloConfigBuilder {
            config: Self::new(silo_id, bind_addr),
        }
    }

    /// Validate tunable combinations.
    pub fn validate(&self) -> Result<(), SiloError> {
        if self.bind_addr.is_empty() {
            return Err(SiloError::Config("bind_addr must not be empty".to_string()));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(SiloError::Config(
                "shutdown_timeout must be > 0".to_string(),
            ));
        }
        if self.transport.request_timeout.is_zero() {
            return Err(SiloError::Config(
                "transport.request_timeout must be > 0".to_string(),
            ));
        }

        let adaptive = &self.mailbox.adaptive;
        if adaptive.enabled {
            if adaptive.min_capacity == 0 || adaptive.min_capacity > adaptive.max_capacity {
                return Err(SiloError::Config(
                    "adaptive capacity bounds must satisfy 0 < min <= max".to_string(),
                ));
            }
            if adaptive.shrink_threshold >= adaptive.grow_threshold {
                return Err(SiloError::Config(
                    "adaptive shrink_threshold must be below grow_threshold".to_string(),
                ));
            }
            if adaptive.growth_factor <= 1.0 || adaptive.shrink_factor >= 1.0 {
                return Err(SiloError::Config(
                    "adaptive factors must grow above 1.0 and shrink below 1.0".to_string(),
                ));
            }
        }

        if self.supervision.multiplier < 1.0 {
            return Err(SiloError::Config(
                "supervision.multiplier must be >= 1.0".to_string(),
            ));
        }
        if self.serverless.enabled && self.serverless.check_interval.is_zero() {
            return Err(SiloError::Config(
                "serverless.check_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder over [`SiloConfig`].
#[derive(Debug, Clone)]
pub struct SiloConfigBuilder {
    config: SiloConfig,
}

impl SiloConfigBuilder {
    /// Set mailbox defaults.
    pub fn with_mailbox(mut self, mailbox: MailboxOptions) -> Self {
        self.config.mailbox = mailbox;
        self
    }

    /// Set supervision defaults.
    pub fn with_supervision(mut self, supervision: SupervisionOptions) -> Self {
        self.config.supervision = supervision;
        self
    }

    /// Set idle-deactivation behavior.
    pub fn with_serverless(mut self, serverless: ServerlessOptions) -> Self {
        self.config.serverless = serverless;
        self
    }

    /// Set the per-request transport deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.request_timeout = timeout;
        self
    }

    /// Set connection hygiene behavior.
    pub fn with_channel_pool(mut self, pool: ChannelPoolOptions) -> Self {
        self.config.channel_pool = pool;
        self
    }

    /// Set the shutdown drain deadline.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Set the reminder sweep interval.
    pub fn with_reminder_scan_interval(mut self, interval: Duration) -> Self {
        self.config.reminder_scan_interval = interval;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<SiloConfig, SiloError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
