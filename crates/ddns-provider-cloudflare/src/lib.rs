// # Cloudflare DNS Provider
//
// This crate provides a Cloudflare DNS provider implementation for the DDNS system.
//
// ## Behaviour
//
// - Every request goes through the core `HttpTransport` (bounded retries on
//   transport failures, 10s per-request timeout)
// - HTTP status codes are inspected: a non-2xx answer is an error, never a
//   silent success
// - Undecodable bodies are `MalformedResponse`, never an empty result
// - Dry-run mode performs lookups but only logs create/update payloads
// - No state between calls: zone and record identifiers are passed in
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::{DEFAULT_API_BASE_URL, ProviderConfig, RecordType};
use ddns_core::traits::{DnsProvider, DnsRecord, RecordPayload, Zone};
use ddns_core::transport::{HttpResponse, HttpTransport};
use ddns_core::{Error, Result};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

/// Record id returned by create calls in dry-run mode
pub const DRY_RUN_RECORD_ID: &str = "dry-run";

/// Longest slice of a non-JSON error body quoted in error messages
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Cloudflare v4 response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: String,
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record lookup)
/// - Log the intended POST/PUT payload
/// - **NOT** actually create or modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests and API gateways)
    base_url: String,

    /// Retrying HTTP transport
    transport: HttpTransport,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider against the public API
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:Read and DNS:Edit permissions
    /// - `transport`: Retrying transport shared with the rest of the process
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the token is empty.
    pub fn new(
        api_token: impl Into<String>,
        transport: HttpTransport,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        Ok(Self {
            api_token,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            transport,
            dry_run,
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig, transport: HttpTransport) -> Result<Self> {
        if config.dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self::new(config.api_token.clone(), transport, config.dry_run)?
            .with_base_url(config.api_base_url.clone()))
    }

    /// Use a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.api_token)
            .header(CONTENT_TYPE, "application/json")
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn find_zone(&self, domain: &str) -> Result<Zone> {
        tracing::debug!("Looking up zone for domain: {}", domain);

        let url = self.url("/zones");
        let response = self
            .transport
            .execute("GET /zones", |client| {
                self.authorized(client.get(&url)).query(&[("name", domain)])
            })
            .await?;

        if response.status.as_u16() == 404 {
            return Err(Error::zone_not_found(domain));
        }
        if !response.is_success() {
            return Err(lookup_error(&response, "Zone lookup failed"));
        }

        let envelope: Envelope<Vec<Zone>> = response.json()?;
        let zones = successful_result(envelope, &response)
            .map_err(|message| Error::api(response.status.as_u16(), message))?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::zone_not_found(domain))?;

        tracing::debug!("Found zone ID: {}", zone.id);
        Ok(zone)
    }

    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    ///
    /// Records of other types under the same name (the A record of a
    /// dual-stack host when AAAA is requested) are never returned.
    async fn find_record(
        &self,
        zone_id: &str,
        fqdn: &str,
        record_type: RecordType,
    ) -> Result<Option<DnsRecord>> {
        tracing::debug!("Looking up {} record: {}", record_type, fqdn);

        let url = self.url(&format!("/zones/{}/dns_records", zone_id));
        let response = self
            .transport
            .execute("GET /dns_records", |client| {
                self.authorized(client.get(&url)).query(&[("name", fqdn)])
            })
            .await?;

        if !response.is_success() {
            return Err(lookup_error(&response, "Record lookup failed"));
        }

        let envelope: Envelope<Vec<DnsRecord>> = response.json()?;
        let records = successful_result(envelope, &response)
            .map_err(|message| Error::api(response.status.as_u16(), message))?;

        let total = records.len();
        let record = records.into_iter().find(|r| r.has_type(record_type));
        match &record {
            Some(record) => tracing::debug!("Found record ID: {}", record.id),
            None => tracing::debug!(
                "No {} record named {} ({} record(s) of other types)",
                record_type,
                fqdn,
                total
            ),
        }

        Ok(record)
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// { "type": "A", "name": "home.example.com", "content": "203.0.113.7", "ttl": 120 }
    /// ```
    async fn create_record(&self, zone_id: &str, record: &RecordPayload) -> Result<String> {
        let url = self.url(&format!("/zones/{}/dns_records", zone_id));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(record).unwrap_or_default()
            );
            return Ok(DRY_RUN_RECORD_ID.to_string());
        }

        let response = self
            .transport
            .execute("POST /dns_records", |client| {
                self.authorized(client.post(&url)).json(record)
            })
            .await
            .map_err(|e| Error::record_create(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::record_create(describe_failure(&response)));
        }

        let envelope: Envelope<CreatedRecord> = response.json()?;
        let created = successful_result(envelope, &response).map_err(Error::record_create)?;

        if created.id.is_empty() {
            return Err(Error::malformed("created record has an empty id"));
        }

        Ok(created.id)
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// { "type": "A", "name": "home.example.com", "content": "203.0.113.7", "ttl": 120 }
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &RecordPayload,
    ) -> Result<()> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id));

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(record).unwrap_or_default()
            );
            return Ok(());
        }

        let response = self
            .transport
            .execute("PUT /dns_records", |client| {
                self.authorized(client.put(&url)).json(record)
            })
            .await
            .map_err(|e| Error::record_update(e.to_string()))?;

        if !response.is_success() {
            return Err(Error::record_update(describe_failure(&response)));
        }

        let envelope: Envelope<serde_json::Value> = response.json()?;
        if envelope.success == Some(false) {
            return Err(Error::record_update(describe_failure(&response)));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Unwrap the envelope's result, or describe why it is unusable
fn successful_result<T>(
    envelope: Envelope<T>,
    response: &HttpResponse,
) -> std::result::Result<T, String> {
    if envelope.success == Some(false) {
        return Err(join_messages(&envelope.errors)
            .unwrap_or_else(|| format!("request rejected (status {})", response.status.as_u16())));
    }

    envelope
        .result
        .ok_or_else(|| "response has no result".to_string())
}

/// Map a non-2xx lookup response to an error
fn lookup_error(response: &HttpResponse, context: &str) -> Error {
    let status = response.status.as_u16();

    let message = match status {
        401 | 403 => {
            "Authentication failed: Invalid API token or insufficient permissions".to_string()
        }
        429 => "Rate limit exceeded. Please retry later".to_string(),
        500..=599 => format!("Cloudflare server error (transient): {}", describe_failure(response)),
        _ => format!("{}: {}", context, describe_failure(response)),
    };

    Error::api(status, message)
}

/// Human-readable description of a failed response
fn describe_failure(response: &HttpResponse) -> String {
    let details = response
        .json::<Envelope<serde_json::Value>>()
        .ok()
        .and_then(|envelope| join_messages(&envelope.errors))
        .unwrap_or_else(|| {
            let body = response.body.trim();
            if body.is_empty() {
                "empty response body".to_string()
            } else {
                body.chars().take(MAX_ERROR_BODY_CHARS).collect()
            }
        });

    format!("status {}: {}", response.status.as_u16(), details)
}

fn join_messages(errors: &[ApiMessage]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }

    Some(
        errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
