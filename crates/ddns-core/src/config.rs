//! Configuration types for the DDNS system
//!
//! This module defines all configuration structures used throughout the crate.
//! Every structure is read-only once the engine has been constructed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default Cloudflare API v4 base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Default IPv4 echo service
pub const DEFAULT_IPV4_URL: &str = "https://api.ipify.org";

/// Default IPv6-capable echo service
pub const DEFAULT_IPV6_URL: &str = "https://api64.ipify.org";

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// The DNS record to maintain
    pub record: RecordConfig,

    /// Public IP source configuration
    #[serde(default)]
    pub ip_source: IpSourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Retry and timeout settings for every outbound request
    #[serde(default)]
    pub transport: TransportConfig,
}

impl DdnsConfig {
    /// Create a configuration for a single record with defaults everywhere else
    pub fn new(api_token: impl Into<String>, record_name: impl Into<String>) -> Self {
        Self {
            provider: ProviderConfig::new(api_token),
            record: RecordConfig::new(record_name),
            ip_source: IpSourceConfig::default(),
            engine: EngineConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.record.validate()?;
        self.ip_source.validate()?;
        self.engine.validate()?;
        self.transport.validate()?;
        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API bearer token. Never logged.
    pub api_token: String,

    /// Base URL of the provider REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Perform lookups but skip create/update writes
    #[serde(default)]
    pub dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &"<REDACTED>")
            .field("api_base_url", &self.api_base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a live provider configuration against the default API
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_base_url: default_api_base_url(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("API token cannot be empty"));
        }
        if self.api_base_url.is_empty() {
            return Err(crate::Error::config("API base URL cannot be empty"));
        }
        Ok(())
    }
}

/// DNS record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Fully-qualified DNS name (e.g. "home.example.com")
    pub name: String,

    /// TTL in seconds applied on create and update
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Create the record if it does not exist yet
    #[serde(default)]
    pub auto_create: bool,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: default_ttl(),
            auto_create: false,
        }
    }

    /// Set the record TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Enable or disable record creation
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("DNS name cannot be empty"));
        }
        if self.ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }
        Ok(())
    }
}

/// Public IP source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// Address family to publish
    #[serde(default)]
    pub version: IpVersion,

    /// Echo service used for IPv4
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,

    /// Echo service used for IPv6
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,
}

impl IpSourceConfig {
    /// The echo service for the given family
    pub fn url_for(&self, version: IpVersion) -> &str {
        match version {
            IpVersion::V4 => &self.ipv4_url,
            IpVersion::V6 => &self.ipv6_url,
        }
    }

    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ipv4_url.is_empty() {
            return Err(crate::Error::config("IPv4 echo URL cannot be empty"));
        }
        if self.ipv6_url.is_empty() {
            return Err(crate::Error::config("IPv6 echo URL cannot be empty"));
        }
        Ok(())
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            version: IpVersion::default(),
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
        }
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 (A records)
    #[default]
    V4,
    /// IPv6 (AAAA records)
    V6,
}

impl IpVersion {
    /// Parse a family selector such as "ipv4", "v6" (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ipv4" | "v4" | "4" => Some(Self::V4),
            "ipv6" | "v6" | "6" => Some(Self::V6),
            _ => None,
        }
    }

    /// The record type that carries addresses of this family
    pub fn record_type(self) -> RecordType {
        match self {
            IpVersion::V4 => RecordType::A,
            IpVersion::V6 => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("ipv4"),
            IpVersion::V6 => f.write_str("ipv6"),
        }
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Wire name of the record type
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between two reconciliation cycles
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new engine events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// The steady-state loop period
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.update_interval_secs == 0 {
            return Err(crate::Error::config("Update interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Retry policy and timeout for outbound requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound of the base delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplicative growth of the delay after each failure
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Jitter added to each sleep, as a fraction of the current delay
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl TransportConfig {
    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_attempts == 0 {
            return Err(crate::Error::config("Transport max_attempts must be > 0"));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(crate::Error::config(
                "Transport backoff_factor must be a finite value >= 1.0",
            ));
        }
        if !self.jitter_factor.is_finite() || self.jitter_factor < 0.0 {
            return Err(crate::Error::config(
                "Transport jitter_factor must be a finite value >= 0.0",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Request timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            jitter_factor: default_jitter_factor(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_ipv4_url() -> String {
    DEFAULT_IPV4_URL.to_string()
}

fn default_ipv6_url() -> String {
    DEFAULT_IPV6_URL.to_string()
}

fn default_ttl() -> u32 {
    120
}

fn default_update_interval_secs() -> u64 {
    600
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter_factor() -> f64 {
    0.1
}

fn default_request_timeout_secs() -> u64 {
    10
}
