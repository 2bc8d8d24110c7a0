// # ddns-core
//
// Core library for the DDNS reconciliation loop.
//
// ## Architecture Overview
//
// This library provides the core functionality for dynamic DNS updates:
// - **IpSource**: Trait for resolving the current public IP
// - **DnsProvider**: Trait for zone/record lookup, creation and update
// - **HttpTransport**: Bounded exponential-backoff retries for every request
// - **DdnsEngine**: Startup resolution plus the steady-state drift loop
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider and IP source crates
// 2. **Two-tier resilience**: Bounded retries per request, unbounded retries across cycles
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Updates are only sent when the public IP drifted

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod transport;

// Re-export core types for convenience
pub use traits::{DnsProvider, DnsRecord, IpSource, RecordPayload, Zone, zone_domain};
pub use engine::{CycleOutcome, DdnsEngine, EngineEvent, ManagedRecord};
pub use config::{DdnsConfig, IpSourceConfig, IpVersion, ProviderConfig, RecordConfig, RecordType};
pub use error::{Error, Result};
pub use transport::{HttpResponse, HttpTransport, RetryPolicy};
