// # IP Source Trait
//
// Defines the interface for resolving the caller's current public IP address.
//
// ## Implementations
//
// - HTTP echo services: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
// use ddns_core::config::IpVersion;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current(IpVersion::V4).await?;
//     println!("Public IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use crate::config::IpVersion;
use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - The returned address is always of the requested family. A body that
///   is not a valid address of that family is an error, never a value.
/// - Implementations do not cache: every call observes the network.
/// - Scheduling belongs to `DdnsEngine`; sources never poll on their own.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address of the given family
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error::IpResolution)`: The service answered with something unusable
    /// - `Err(Error::TransportExhausted)`: The service could not be reached
    async fn current(&self, version: IpVersion) -> Result<IpAddr, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
