// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the DDNS system.
//
// ## Architecture
//
// Fetches the current public IP from an echo service (e.g. api.ipify.org)
// that answers a GET with the caller's address as plain text. One URL is
// configured per address family.
//
// ## Validation
//
// The body is trimmed and must parse as an address of the requested family.
// Anything else (HTML error pages, an IPv4 answer to an IPv6 query, empty
// bodies) is an `IpResolution` error, so the engine never publishes junk.

use async_trait::async_trait;
use ddns_core::config::{IpSourceConfig, IpVersion};
use ddns_core::traits::IpSource;
use ddns_core::transport::HttpTransport;
use ddns_core::{Error, Result};
use std::net::IpAddr;

/// Longest slice of an invalid body quoted in error messages
const MAX_QUOTED_BODY_CHARS: usize = 64;

/// HTTP echo-service IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL queried for IPv4
    ipv4_url: String,

    /// URL queried for IPv6
    ipv6_url: String,

    /// Retrying HTTP transport
    transport: HttpTransport,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `ipv4_url`: URL answering with the public IPv4 address
    /// - `ipv6_url`: URL answering with the public IPv6 address
    /// - `transport`: Retrying transport shared with the rest of the process
    pub fn new(
        ipv4_url: impl Into<String>,
        ipv6_url: impl Into<String>,
        transport: HttpTransport,
    ) -> Self {
        Self {
            ipv4_url: ipv4_url.into(),
            ipv6_url: ipv6_url.into(),
            transport,
        }
    }

    /// Create from configuration
    pub fn from_config(config: &IpSourceConfig, transport: HttpTransport) -> Self {
        Self::new(
            config.url_for(IpVersion::V4),
            config.url_for(IpVersion::V6),
            transport,
        )
    }

    fn url_for(&self, version: IpVersion) -> &str {
        match version {
            IpVersion::V4 => &self.ipv4_url,
            IpVersion::V6 => &self.ipv6_url,
        }
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, version: IpVersion) -> Result<IpAddr> {
        let url = self.url_for(version);
        tracing::debug!("Fetching public {} address from {}", version, url);

        let response = self
            .transport
            .execute("GET public IP", |client| client.get(url))
            .await?;

        if !response.is_success() {
            return Err(Error::ip_resolution(format!(
                "{} answered with status {}",
                url,
                response.status.as_u16()
            )));
        }

        parse_address(&response.body, version)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse an echo-service body as an address of the given family
pub fn parse_address(body: &str, version: IpVersion) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text.parse().map_err(|_| {
        let quoted: String = text.chars().take(MAX_QUOTED_BODY_CHARS).collect();
        Error::ip_resolution(format!("Invalid IP address: {:?}", quoted))
    })?;

    let matches_family = match version {
        IpVersion::V4 => ip.is_ipv4(),
        IpVersion::V6 => ip.is_ipv6(),
    };

    if !matches_family {
        return Err(Error::ip_resolution(format!(
            "Expected {} address, got: {}",
            version, ip
        )));
    }

    Ok(ip)
}
