// # DNS Provider Trait
//
// Defines the interface to a DNS directory service: zone lookup, record
// lookup, record creation and record update.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, RecordPayload};
// use ddns_core::config::RecordType;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let zone = provider.find_zone("example.com").await?;
//     if let Some(record) = provider
//         .find_record(&zone.id, "home.example.com", RecordType::A)
//         .await?
//     {
//         provider.update_record(
//             &zone.id,
//             &record.id,
//             &RecordPayload::new(RecordType::A, "home.example.com", "203.0.113.7", 120),
//         ).await?;
//     }
//
//     Ok(())
// }
// ```

use crate::config::RecordType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A DNS zone as known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone identifier
    pub id: String,
    /// Zone apex (e.g. "example.com")
    pub name: String,
}

/// A DNS record as known to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record identifier
    pub id: String,
    /// Fully-qualified record name
    pub name: String,
    /// Record content (the IP address for A/AAAA records)
    pub content: String,
    /// Record type as reported by the provider ("A", "AAAA", "CNAME", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
}

impl DnsRecord {
    /// Whether the provider reported the given type for this record
    pub fn has_type(&self, record_type: RecordType) -> bool {
        self.record_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(record_type.as_str()))
    }
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayload {
    /// A or AAAA
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Fully-qualified record name
    pub name: String,
    /// IP address
    pub content: String,
    /// TTL in seconds
    pub ttl: u32,
}

impl RecordPayload {
    /// Create a record payload
    pub fn new(
        record_type: RecordType,
        name: impl Into<String>,
        content: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            record_type,
            name: name.into(),
            content: content.into(),
            ttl,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Every method performs its requests through the core transport and is
/// therefore retried on transport failures only. Providers hold no state
/// between calls: zone and record identifiers are owned by `DdnsEngine`
/// and passed in.
///
/// # "Not found" is not a failure
///
/// [`find_record`](DnsProvider::find_record) returns `Ok(None)` when the
/// name has no record. Only [`find_zone`](DnsProvider::find_zone) treats
/// absence as an error, since nothing can be maintained without a zone.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Find the zone for a registrable domain
    ///
    /// When several zones match, the first one in provider order is used.
    ///
    /// # Returns
    ///
    /// - `Ok(Zone)`: The zone
    /// - `Err(Error::ZoneNotFound)`: No zone matches the domain
    async fn find_zone(&self, domain: &str) -> Result<Zone, crate::Error>;

    /// Find a record of the given type by fully-qualified name within a zone
    ///
    /// A name may carry records of several types (A and AAAA on a
    /// dual-stack host). Only records of `record_type` are candidates; the
    /// first one in provider order is returned.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(DnsRecord))`: The record
    /// - `Ok(None)`: No record of that type exists for the name
    async fn find_record(
        &self,
        zone_id: &str,
        fqdn: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>, crate::Error>;

    /// Create a record
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The new record's identifier
    /// - `Err(Error::RecordCreate)`: The provider rejected the record or
    ///   could not be reached
    async fn create_record(
        &self,
        zone_id: &str,
        record: &RecordPayload,
    ) -> Result<String, crate::Error>;

    /// Replace a record's content
    ///
    /// # Idempotency
    ///
    /// Applying the same payload twice has no further observable effect.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The record now has the payload's content
    /// - `Err(Error::RecordUpdate)`: The provider rejected the update or
    ///   could not be reached
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordPayload,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Registrable domain of a DNS name: its last two labels
///
/// `"host.sub.example.com"` → `"example.com"`. Names with fewer than two
/// labels are returned unchanged. A trailing root dot is ignored.
pub fn zone_domain(dns_name: &str) -> &str {
    let name = dns_name.strip_suffix('.').unwrap_or(dns_name);

    match name.rmatch_indices('.').nth(1) {
        Some((idx, _)) => &name[idx + 1..],
        None => name,
    }
}
