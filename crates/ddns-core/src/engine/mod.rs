//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Resolving the zone and the record once at startup (creating it if allowed)
//! - Resolving the public IP once per cycle via IpSource
//! - Comparing it to the last-known IP
//! - Updating the DNS record via DnsProvider when it drifted
//!
//! ## Architecture
//!
//! ```text
//!                   ┌──────────────┐
//!                   │  DdnsEngine  │──── EngineEvent ───▶ (monitoring)
//!                   └──────────────┘
//!                      │        │
//!          ┌───────────┘        └───────────┐
//!          ▼                                ▼
//!   ┌─────────────┐                  ┌─────────────┐
//!   │  IpSource   │                  │ DnsProvider │
//!   │  (current)  │                  │ (zone/rec)  │
//!   └─────────────┘                  └─────────────┘
//!          │                                │
//!          └──────────► HttpTransport ◄─────┘
//! ```
//!
//! ## Phases
//!
//! **Startup** (once): find zone → find record → create it if absent and
//! auto-create is enabled → seed the last-known IP. Every error here is
//! fatal. An absent record with auto-create disabled ends the engine
//! cleanly.
//!
//! **Steady state** (every interval): resolve IP → compare → update on
//! drift. Every error here is logged and the cycle is skipped. The cache
//! only moves after a successful update, so a failed update is attempted
//! again on the next cycle.

use crate::config::{DdnsConfig, IpVersion, RecordConfig, RecordType};
use crate::error::Result;
use crate::traits::{DnsProvider, IpSource, RecordPayload, Zone, zone_domain};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        record_name: String,
    },

    /// Zone found at startup
    ZoneResolved {
        zone_id: String,
        zone_name: String,
    },

    /// Existing record found at startup
    RecordResolved {
        record_id: String,
        content: String,
    },

    /// Record created at startup
    RecordCreated {
        record_id: String,
        ip: String,
    },

    /// Public IP equals the last-known IP
    IpUnchanged {
        ip: String,
    },

    /// DNS update succeeded
    UpdateSucceeded {
        previous_ip: String,
        new_ip: String,
        /// When `previous_ip` was seeded or last published
        previous_since: DateTime<Utc>,
    },

    /// DNS update failed; retried next cycle
    UpdateFailed {
        target_ip: String,
        error: String,
    },

    /// Public IP could not be resolved; cycle skipped
    IpResolutionFailed {
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Result of one steady-state cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No drift; nothing sent
    Unchanged,
    /// Drift detected and the record was updated
    Updated,
    /// Drift detected but the update failed
    UpdateFailed,
    /// The public IP could not be resolved
    IpUnavailable,
}

/// The record kept up to date, with the last-known-IP cache
///
/// Owned exclusively by the running loop; identifiers and type are fixed
/// once established.
#[derive(Debug, Clone)]
pub struct ManagedRecord {
    zone: Zone,
    record_id: String,
    record_type: RecordType,
    last_known_ip: String,
    last_changed: DateTime<Utc>,
}

impl ManagedRecord {
    pub(crate) fn new(
        zone: Zone,
        record_id: String,
        record_type: RecordType,
        last_known_ip: String,
    ) -> Self {
        Self {
            zone,
            record_id,
            record_type,
            last_known_ip,
            last_changed: Utc::now(),
        }
    }

    /// The zone the record lives in
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// Provider-assigned record identifier
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Record type sent on every update
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// The content last known to be published
    pub fn last_known_ip(&self) -> &str {
        &self.last_known_ip
    }

    /// When the cache was last seeded or replaced
    pub fn last_changed(&self) -> DateTime<Utc> {
        self.last_changed
    }

    /// Replace the cached IP; returns the previous IP and when it was set
    fn replace_ip(&mut self, ip: String) -> (String, DateTime<Utc>) {
        let since = std::mem::replace(&mut self.last_changed, Utc::now());
        (std::mem::replace(&mut self.last_known_ip, ip), since)
    }
}

/// Core DDNS engine
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Start with [`DdnsEngine::run_until()`]
/// 3. Engine runs until the shutdown future completes
///
/// ## Threading
///
/// All work happens sequentially on the task that drives `run`. The only
/// mutable state, the [`ManagedRecord`], lives on that task's stack.
pub struct DdnsEngine {
    /// IP source for the current public address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for zone/record operations
    provider: Box<dyn DnsProvider>,

    /// The record to maintain
    record: RecordConfig,

    /// Address family to publish
    version: IpVersion,

    /// Period of the steady-state loop
    update_interval: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `config`: DDNS configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            ip_source,
            provider,
            update_interval: config.engine.update_interval(),
            version: config.ip_source.version,
            record: config.record,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the engine until `shutdown` completes
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown, or nothing to maintain
    /// - `Err(Error)`: Fatal startup error
    ///
    /// Shutdown interrupts the startup phase, an in-flight cycle (including
    /// transport backoff) and the interval sleep.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.emit_event(EngineEvent::Started {
            record_name: self.record.name.clone(),
        });

        let startup = tokio::select! {
            result = self.bootstrap() => result?,
            _ = &mut shutdown => {
                self.stopped("Shutdown signal");
                return Ok(());
            }
        };

        let Some(mut managed) = startup else {
            info!(
                "{} record {} not found and auto-creation is disabled. Exiting",
                self.version.record_type(),
                self.record.name
            );
            self.stopped("No record to maintain");
            return Ok(());
        };

        loop {
            tokio::select! {
                _ = self.reconcile(&mut managed) => {}
                _ = &mut shutdown => break,
            }

            debug!("Next update in {} seconds", self.update_interval.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(self.update_interval) => {}
                _ = &mut shutdown => break,
            }
        }

        self.stopped("Shutdown signal");
        Ok(())
    }

    /// Startup phase: resolve zone and record, creating the record if allowed
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ManagedRecord))`: Ready for the steady-state loop
    /// - `Ok(None)`: Record absent and auto-create disabled
    /// - `Err(Error)`: Fatal startup error
    pub async fn bootstrap(&self) -> Result<Option<ManagedRecord>> {
        let name = &self.record.name;
        let record_type = self.version.record_type();

        let zone = self.provider.find_zone(zone_domain(name)).await?;
        info!("Found zone: {} (ID: {})", zone.name, zone.id);
        self.emit_event(EngineEvent::ZoneResolved {
            zone_id: zone.id.clone(),
            zone_name: zone.name.clone(),
        });

        match self.provider.find_record(&zone.id, name, record_type).await? {
            Some(record) => {
                info!(
                    "Found {} record: {} (ID: {}, content: {})",
                    record_type, record.name, record.id, record.content
                );

                self.emit_event(EngineEvent::RecordResolved {
                    record_id: record.id.clone(),
                    content: record.content.clone(),
                });

                Ok(Some(ManagedRecord::new(
                    zone,
                    record.id,
                    record_type,
                    record.content,
                )))
            }
            None if self.record.auto_create => {
                info!("{} record not found. Creating new record: {}", record_type, name);

                let ip = self.ip_source.current(self.version).await?.to_string();
                let payload = RecordPayload::new(record_type, name.as_str(), ip.as_str(), self.record.ttl);
                let record_id = self.provider.create_record(&zone.id, &payload).await?;

                info!("DNS record created: {} -> {} (ID: {})", name, ip, record_id);
                self.emit_event(EngineEvent::RecordCreated {
                    record_id: record_id.clone(),
                    ip: ip.clone(),
                });

                Ok(Some(ManagedRecord::new(zone, record_id, record_type, ip)))
            }
            None => Ok(None),
        }
    }

    /// One steady-state cycle
    ///
    /// Never fails: errors are logged, reported as events and reflected in
    /// the returned outcome. The cache is replaced only after a successful
    /// update.
    pub async fn reconcile(&self, managed: &mut ManagedRecord) -> CycleOutcome {
        let ip = match self.ip_source.current(self.version).await {
            Ok(ip) => ip.to_string(),
            Err(e) => {
                warn!(
                    "Failed to resolve public IP via {}: {}",
                    self.ip_source.source_name(),
                    e
                );
                self.emit_event(EngineEvent::IpResolutionFailed {
                    error: e.to_string(),
                });
                return CycleOutcome::IpUnavailable;
            }
        };

        if ip == managed.last_known_ip {
            info!("IP address unchanged ({}). No update necessary", ip);
            self.emit_event(EngineEvent::IpUnchanged { ip });
            return CycleOutcome::Unchanged;
        }

        info!(
            "IP address changed: {} -> {}",
            managed.last_known_ip, ip
        );

        let payload = RecordPayload::new(
            managed.record_type,
            self.record.name.as_str(),
            ip.as_str(),
            self.record.ttl,
        );

        match self
            .provider
            .update_record(&managed.zone.id, &managed.record_id, &payload)
            .await
        {
            Ok(()) => {
                let (previous_ip, previous_since) = managed.replace_ip(ip.clone());
                info!(
                    "DNS record updated: {} -> {} (previous {} held since {})",
                    self.record.name,
                    ip,
                    previous_ip,
                    previous_since.to_rfc3339()
                );
                self.emit_event(EngineEvent::UpdateSucceeded {
                    previous_ip,
                    new_ip: ip,
                    previous_since,
                });
                CycleOutcome::Updated
            }
            Err(e) => {
                warn!(
                    "Failed to update DNS record {} via {}: {}. Retrying next cycle",
                    self.record.name,
                    self.provider.provider_name(),
                    e
                );
                self.emit_event(EngineEvent::UpdateFailed {
                    target_ip: ip,
                    error: e.to_string(),
                });
                CycleOutcome::UpdateFailed
            }
        }
    }

    fn stopped(&self, reason: &str) {
        info!("Engine stopped: {}", reason);
        self.emit_event(EngineEvent::Stopped {
            reason: reason.to_string(),
        });
    }

    /// Emit an engine event
    ///
    /// Never blocks: a full channel drops the event with a warning.
    fn emit_event(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }
}
