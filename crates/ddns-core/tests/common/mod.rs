//! Test doubles and common utilities for engine contract tests
//!
//! The doubles never touch the network. Each one keeps its counters behind
//! `Arc`s so a test can hand one instance to the engine and keep a second
//! instance (built with `sharing_counters_with`) for assertions.

#![allow(dead_code)]

use ddns_core::config::{DdnsConfig, RecordType};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, DnsRecord, IpSource, RecordPayload, Zone};
use ddns_core::IpVersion;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_ID: &str = "zone-1";
pub const ZONE_NAME: &str = "example.com";
pub const RECORD_ID: &str = "rec-1";
pub const CREATED_RECORD_ID: &str = "rec-created";

/// Parse an address literal
pub fn ip(addr: &str) -> IpAddr {
    addr.parse().expect("valid address literal")
}

/// Configuration for a single record with defaults everywhere else
pub fn minimal_config(record_name: &str) -> DdnsConfig {
    DdnsConfig::new("test-token", record_name)
}

/// An IpSource that answers from a script
///
/// Each call to `current()` pops the next answer. Once the script is
/// exhausted the last answer is repeated forever.
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<std::result::Result<IpAddr, String>>>>,
    last: Arc<Mutex<Option<std::result::Result<IpAddr, String>>>>,
    current_call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<std::result::Result<IpAddr, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with the same address
    pub fn constant(addr: &str) -> Self {
        Self::new(vec![Ok(ip(addr))])
    }

    /// Answer with each address in turn, then repeat the last one
    pub fn sequence(addrs: &[&str]) -> Self {
        Self::new(addrs.iter().map(|a| Ok(ip(a))).collect())
    }

    /// Create a new ScriptedIpSource that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            current_call_count: Arc::clone(&other.current_call_count),
        }
    }

    /// Get the number of times current() was called
    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self, _version: IpVersion) -> Result<IpAddr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = Some(next);
        }

        match last.as_ref() {
            Some(Ok(addr)) => Ok(*addr),
            Some(Err(message)) => Err(Error::ip_resolution(message.clone())),
            None => Err(Error::ip_resolution("empty script")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock DnsProvider that records every call
pub struct MockDnsProvider {
    zone: Option<Zone>,
    record: Option<DnsRecord>,
    stall_zone_lookup: bool,
    fail_record_lookup: bool,
    fail_create: bool,
    /// Number of upcoming update_record() calls that fail
    failing_updates: Arc<AtomicUsize>,
    zone_lookups: Arc<Mutex<Vec<String>>>,
    record_lookups: Arc<Mutex<Vec<String>>>,
    created: Arc<Mutex<Vec<RecordPayload>>>,
    updated: Arc<Mutex<Vec<(String, String, RecordPayload)>>>,
}

impl MockDnsProvider {
    /// Provider whose zone holds `name` with the given content
    ///
    /// The record type follows the content: AAAA for an IPv6 literal,
    /// A otherwise.
    pub fn with_record(name: &str, content: &str) -> Self {
        let record_type = match content.parse::<IpAddr>() {
            Ok(addr) if addr.is_ipv6() => RecordType::Aaaa,
            _ => RecordType::A,
        };
        Self::with_typed_record(name, content, record_type)
    }

    /// Provider whose zone holds `name` as a record of an explicit type
    pub fn with_typed_record(name: &str, content: &str, record_type: RecordType) -> Self {
        Self::build(
            Some(DnsRecord {
                id: RECORD_ID.to_string(),
                name: name.to_string(),
                content: content.to_string(),
                record_type: Some(record_type.as_str().to_string()),
            }),
            true,
        )
    }

    /// Provider whose zone exists but holds no record for the name
    pub fn without_record() -> Self {
        Self::build(None, true)
    }

    /// Provider that knows no zone at all
    pub fn without_zone() -> Self {
        Self::build(None, false)
    }

    fn build(record: Option<DnsRecord>, has_zone: bool) -> Self {
        Self {
            zone: has_zone.then(|| Zone {
                id: ZONE_ID.to_string(),
                name: ZONE_NAME.to_string(),
            }),
            record,
            stall_zone_lookup: false,
            fail_record_lookup: false,
            fail_create: false,
            failing_updates: Arc::new(AtomicUsize::new(0)),
            zone_lookups: Arc::new(Mutex::new(Vec::new())),
            record_lookups: Arc::new(Mutex::new(Vec::new())),
            created: Arc::new(Mutex::new(Vec::new())),
            updated: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail the next `count` update_record() calls
    pub fn failing_updates(self, count: usize) -> Self {
        self.failing_updates.store(count, Ordering::SeqCst);
        self
    }

    /// Never answer find_zone()
    pub fn stalling_zone_lookup(mut self) -> Self {
        self.stall_zone_lookup = true;
        self
    }

    /// Fail every find_record() call as an exhausted transport
    pub fn failing_record_lookup(mut self) -> Self {
        self.fail_record_lookup = true;
        self
    }

    /// Reject every create_record() call
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Create a new MockDnsProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            zone: other.zone.clone(),
            record: other.record.clone(),
            stall_zone_lookup: other.stall_zone_lookup,
            fail_record_lookup: other.fail_record_lookup,
            fail_create: other.fail_create,
            failing_updates: Arc::clone(&other.failing_updates),
            zone_lookups: Arc::clone(&other.zone_lookups),
            record_lookups: Arc::clone(&other.record_lookups),
            created: Arc::clone(&other.created),
            updated: Arc::clone(&other.updated),
        }
    }

    /// Domains passed to find_zone()
    pub fn zone_lookups(&self) -> Vec<String> {
        self.zone_lookups.lock().unwrap().clone()
    }

    /// Names passed to find_record()
    pub fn record_lookups(&self) -> Vec<String> {
        self.record_lookups.lock().unwrap().clone()
    }

    /// Payloads passed to create_record()
    pub fn created(&self) -> Vec<RecordPayload> {
        self.created.lock().unwrap().clone()
    }

    /// (zone_id, record_id, payload) of every update_record() call
    pub fn updated(&self) -> Vec<(String, String, RecordPayload)> {
        self.updated.lock().unwrap().clone()
    }

    /// Contents sent by update_record(), in call order
    pub fn updated_contents(&self) -> Vec<String> {
        self.updated()
            .into_iter()
            .map(|(_, _, payload)| payload.content)
            .collect()
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.updated.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        self.zone_lookups.lock().unwrap().push(domain.to_string());

        if self.stall_zone_lookup {
            std::future::pending::<()>().await;
        }

        self.zone
            .clone()
            .ok_or_else(|| Error::zone_not_found(domain))
    }

    async fn find_record(
        &self,
        _zone_id: &str,
        fqdn: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>> {
        self.record_lookups.lock().unwrap().push(fqdn.to_string());

        if self.fail_record_lookup {
            return Err(Error::transport_exhausted(
                "GET /dns_records",
                3,
                "connection refused",
            ));
        }

        Ok(self
            .record
            .clone()
            .filter(|record| record.has_type(record_type)))
    }

    async fn create_record(&self, _zone_id: &str, record: &RecordPayload) -> Result<String> {
        self.created.lock().unwrap().push(record.clone());

        if self.fail_create {
            return Err(Error::record_create("status 400: simulated rejection"));
        }

        Ok(CREATED_RECORD_ID.to_string())
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordPayload,
    ) -> Result<()> {
        self.updated.lock().unwrap().push((
            zone_id.to_string(),
            record_id.to_string(),
            record.clone(),
        ));

        let remaining = self.failing_updates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_updates.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::record_update("status 500: simulated failure"));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
