// # ddnsd - DDNS Daemon
//
// Thin integration layer: all DDNS logic lives in ddns-core and the
// provider/IP source crates.
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the Cloudflare provider and the HTTP IP source into the engine
// 4. Running the engine until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Required
// - `CLOUDFLARE_API_TOKEN`: API token (Zone:Read, DNS:Edit)
// - `CLOUDFLARE_DNS_NAME`: Fully-qualified name to keep updated
//
// ### Optional
// - `CLOUDFLARE_DNS_UPDATE_INTERVAL`: Seconds between checks (default 600)
// - `CLOUDFLARE_AUTO_CREATE_DNS`: `true` creates the record if absent
// - `CLOUDFLARE_IP_VERSION`: `ipv4` (default) or `ipv6`
// - `CLOUDFLARE_DNS_TTL`: Record TTL in seconds (default 120)
// - `CLOUDFLARE_IPV4_URL` / `CLOUDFLARE_IPV6_URL`: Public IP echo services
// - `CLOUDFLARE_API_BASE_URL`: Cloudflare API base URL
// - `DDNS_MODE`: `dry-run` performs lookups but never writes records
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_DNS_NAME=home.example.com
// export CLOUDFLARE_AUTO_CREATE_DNS=true
//
// ddnsd
// ```

use anyhow::Result;
use ddns_core::config::{
    DEFAULT_API_BASE_URL, DEFAULT_IPV4_URL, DEFAULT_IPV6_URL, DdnsConfig, IpVersion,
};
use ddns_core::{DdnsEngine, HttpTransport};
use ddns_ip_http::HttpIpSource;
use ddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 600;
const DEFAULT_TTL: u32 = 120;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration error
/// - 2: Startup or runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error
    ConfigError = 1,
    /// Fatal startup or runtime failure
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    api_token: String,
    dns_name: String,
    update_interval_secs: u64,
    auto_create: bool,
    ip_version: IpVersion,
    ttl: u32,
    ipv4_url: String,
    ipv6_url: String,
    api_base_url: String,
    dry_run: bool,
    log_level: String,
    /// Values that fell back to defaults; logged once tracing is up
    warnings: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        let api_token = lookup("CLOUDFLARE_API_TOKEN").ok_or_else(|| {
            anyhow::anyhow!(
                "CLOUDFLARE_API_TOKEN is required. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            )
        })?;

        let dns_name = lookup("CLOUDFLARE_DNS_NAME").ok_or_else(|| {
            anyhow::anyhow!(
                "CLOUDFLARE_DNS_NAME is required. \
                Set it via: export CLOUDFLARE_DNS_NAME=home.example.com"
            )
        })?;

        let raw_interval = lookup("CLOUDFLARE_DNS_UPDATE_INTERVAL");
        let update_interval_secs = match parse_positive::<u64>(raw_interval.as_deref()) {
            Some(secs) => secs,
            None => {
                warnings.push(format!(
                    "Invalid or missing CLOUDFLARE_DNS_UPDATE_INTERVAL '{}', defaulting to {} seconds",
                    raw_interval.unwrap_or_default(),
                    DEFAULT_UPDATE_INTERVAL_SECS
                ));
                DEFAULT_UPDATE_INTERVAL_SECS
            }
        };

        let ip_version = match lookup("CLOUDFLARE_IP_VERSION") {
            None => IpVersion::V4,
            Some(raw) if raw.trim().is_empty() => IpVersion::V4,
            Some(raw) => IpVersion::parse(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "Unknown CLOUDFLARE_IP_VERSION '{}', using ipv4",
                    raw
                ));
                IpVersion::V4
            }),
        };

        let ttl = parse_positive::<u32>(lookup("CLOUDFLARE_DNS_TTL").as_deref())
            .unwrap_or(DEFAULT_TTL);

        let dry_run = match lookup("DDNS_MODE") {
            None => false,
            Some(mode) => match mode.trim().to_lowercase().as_str() {
                "dry-run" => true,
                "" | "live" => false,
                other => {
                    warnings.push(format!("Unknown DDNS_MODE '{}', running live", other));
                    false
                }
            },
        };

        Ok(Self {
            api_token,
            dns_name: dns_name.trim().to_string(),
            update_interval_secs,
            auto_create: lookup("CLOUDFLARE_AUTO_CREATE_DNS").as_deref() == Some("true"),
            ip_version,
            ttl,
            ipv4_url: non_empty_or(lookup("CLOUDFLARE_IPV4_URL"), DEFAULT_IPV4_URL),
            ipv6_url: non_empty_or(lookup("CLOUDFLARE_IPV6_URL"), DEFAULT_IPV6_URL),
            api_base_url: non_empty_or(lookup("CLOUDFLARE_API_BASE_URL"), DEFAULT_API_BASE_URL),
            dry_run,
            log_level: lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            warnings,
        })
    }

    /// Validate the configuration
    ///
    /// This performs validation including:
    /// - Required field presence
    /// - Value format validation (API token, domain name, URLs)
    /// - Log level enumeration
    fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN is required. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
            || token_lower == "changeme"
        {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN appears to be a placeholder. \
                Use an actual API token from the Cloudflare dashboard."
            );
        }

        validate_domain_name(&self.dns_name)?;

        for (name, url) in [
            ("CLOUDFLARE_IPV4_URL", &self.ipv4_url),
            ("CLOUDFLARE_IPV6_URL", &self.ipv6_url),
            ("CLOUDFLARE_API_BASE_URL", &self.api_base_url),
        ] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!("{} must use HTTP or HTTPS scheme. Got: {}", name, url);
            }
        }

        if parse_log_level(&self.log_level).is_none() {
            anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            );
        }

        Ok(())
    }

    /// Build the library configuration
    fn to_ddns_config(&self) -> DdnsConfig {
        let mut config = DdnsConfig::new(self.api_token.clone(), self.dns_name.clone());

        config.provider.api_base_url = self.api_base_url.clone();
        config.provider.dry_run = self.dry_run;
        config.record.ttl = self.ttl;
        config.record.auto_create = self.auto_create;
        config.ip_source.version = self.ip_version;
        config.ip_source.ipv4_url = self.ipv4_url.clone();
        config.ip_source.ipv6_url = self.ipv6_url.clone();
        config.engine.update_interval_secs = self.update_interval_secs;

        config
    }
}

/// Parse a strictly positive integer
fn parse_positive<T>(raw: Option<&str>) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.and_then(|s| s.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035, relaxed
/// the way Cloudflare accepts record names: a leading `*` label (wildcard)
/// and underscores inside labels (`_acme-challenge`, SRV-style names).
/// A single trailing root dot is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for (index, label) in domain.split('.').enumerate() {
        if index == 0 && label == "*" {
            continue;
        }

        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore; '*' only as the first label.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let ddns_config = config.to_ddns_config();
    if let Err(e) = ddns_config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    for warning in &config.warnings {
        warn!("{}", warning);
    }

    info!("Cloudflare DDNS updater started");
    info!("DNS name: {}", config.dns_name);
    info!("Update interval: {} seconds", config.update_interval_secs);
    info!("Auto create DNS: {}", config.auto_create);
    info!("IP version: {}", config.ip_version);
    info!("TTL: {}", config.ttl);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(ddns_config).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: DdnsConfig) -> Result<()> {
    let transport = HttpTransport::new(&config.transport)?;

    let ip_source = HttpIpSource::from_config(&config.ip_source, transport.clone());
    let provider = CloudflareProvider::from_config(&config.provider, transport)?;

    let (engine, mut events) = DdnsEngine::new(Box::new(ip_source), Box::new(provider), config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    engine.run_until(shutdown_signal()).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM, SIGINT)
///
/// Falls back to Ctrl-C when the unix handlers cannot be installed.
#[cfg(unix)]
async fn shutdown_signal() {
    let handlers = signal(SignalKind::terminate())
        .and_then(|sigterm| signal(SignalKind::interrupt()).map(|sigint| (sigterm, sigint)));

    match handlers {
        Ok((mut sigterm, mut sigint)) => {
            let received = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            info!("Received shutdown signal: {}", received);
        }
        Err(e) => {
            warn!("Failed to setup signal handlers: {}. Falling back to Ctrl-C", e);
            wait_for_ctrl_c().await;
        }
    }
}

/// Wait for a shutdown signal (Ctrl-C)
#[cfg(not(unix))]
async fn shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("CLOUDFLARE_API_TOKEN", "cf-test-token-0123456789abcdef"),
            ("CLOUDFLARE_DNS_NAME", "home.example.com"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut vars = minimal();
        vars.extend_from_slice(extra);
        vars
    }

    #[test]
    fn test_defaults() {
        let config = load(&minimal()).unwrap();

        assert_eq!(config.update_interval_secs, 600);
        assert!(!config.auto_create);
        assert_eq!(config.ip_version, IpVersion::V4);
        assert_eq!(config.ttl, 120);
        assert_eq!(config.ipv4_url, DEFAULT_IPV4_URL);
        assert_eq!(config.ipv6_url, DEFAULT_IPV6_URL);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!config.dry_run);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());

        // Missing interval is reported but not fatal
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_missing_required_variables() {
        assert!(load(&[("CLOUDFLARE_DNS_NAME", "home.example.com")]).is_err());
        assert!(load(&[("CLOUDFLARE_API_TOKEN", "cf-test-token-0123456789abcdef")]).is_err());
    }

    #[test]
    fn test_invalid_interval_falls_back() {
        for raw in ["abc", "0", "-5", ""] {
            let config = load(&with(&[("CLOUDFLARE_DNS_UPDATE_INTERVAL", raw)])).unwrap();
            assert_eq!(config.update_interval_secs, 600, "input {:?}", raw);
            assert_eq!(config.warnings.len(), 1);
        }

        let config = load(&with(&[("CLOUDFLARE_DNS_UPDATE_INTERVAL", "30")])).unwrap();
        assert_eq!(config.update_interval_secs, 30);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_invalid_ttl_falls_back() {
        let config = load(&with(&[("CLOUDFLARE_DNS_TTL", "-1")])).unwrap();
        assert_eq!(config.ttl, 120);

        let config = load(&with(&[("CLOUDFLARE_DNS_TTL", "300")])).unwrap();
        assert_eq!(config.ttl, 300);
    }

    #[test]
    fn test_auto_create_requires_exact_true() {
        let config = load(&with(&[("CLOUDFLARE_AUTO_CREATE_DNS", "true")])).unwrap();
        assert!(config.auto_create);

        let config = load(&with(&[("CLOUDFLARE_AUTO_CREATE_DNS", "yes")])).unwrap();
        assert!(!config.auto_create);
    }

    #[test]
    fn test_ip_version_parsing() {
        let config = load(&with(&[("CLOUDFLARE_IP_VERSION", "IPv6")])).unwrap();
        assert_eq!(config.ip_version, IpVersion::V6);

        let config = load(&with(&[("CLOUDFLARE_IP_VERSION", "v4")])).unwrap();
        assert_eq!(config.ip_version, IpVersion::V4);

        let config = load(&with(&[
            ("CLOUDFLARE_DNS_UPDATE_INTERVAL", "60"),
            ("CLOUDFLARE_IP_VERSION", "ipv5"),
        ]))
        .unwrap();
        assert_eq!(config.ip_version, IpVersion::V4);
        assert_eq!(config.warnings.len(), 1);
    }

    #[test]
    fn test_dry_run_mode() {
        let config = load(&with(&[("DDNS_MODE", "dry-run")])).unwrap();
        assert!(config.dry_run);
        assert!(config.to_ddns_config().provider.dry_run);
    }

    #[test]
    fn test_to_ddns_config() {
        let config = load(&with(&[
            ("CLOUDFLARE_DNS_UPDATE_INTERVAL", "45"),
            ("CLOUDFLARE_AUTO_CREATE_DNS", "true"),
            ("CLOUDFLARE_IP_VERSION", "ipv6"),
            ("CLOUDFLARE_DNS_TTL", "300"),
            ("CLOUDFLARE_IPV6_URL", "https://v6.echo.test"),
        ]))
        .unwrap();

        let ddns = config.to_ddns_config();
        assert_eq!(ddns.record.name, "home.example.com");
        assert_eq!(ddns.record.ttl, 300);
        assert!(ddns.record.auto_create);
        assert_eq!(ddns.ip_source.version, IpVersion::V6);
        assert_eq!(ddns.ip_source.url_for(IpVersion::V6), "https://v6.echo.test");
        assert_eq!(ddns.engine.update_interval_secs, 45);
        assert!(ddns.validate().is_ok());
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let config = load(&[
            ("CLOUDFLARE_API_TOKEN", "your_token"),
            ("CLOUDFLARE_DNS_NAME", "home.example.com"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = load(&with(&[("DDNS_LOG_LEVEL", "verbose")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let config = load(&with(&[("CLOUDFLARE_IPV4_URL", "ftp://echo.test")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_domain_name() {
        assert!(validate_domain_name("home.example.com").is_ok());
        assert!(validate_domain_name("home.example.com.").is_ok());
        assert!(validate_domain_name("a-b.example.com").is_ok());
        assert!(validate_domain_name("home_1.example.com").is_ok());
        assert!(validate_domain_name("*.example.com").is_ok());
        assert!(validate_domain_name("_acme-challenge.example.com").is_ok());
        assert!(validate_domain_name("_sip._tcp.example.com").is_ok());

        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("home..example.com").is_err());
        assert!(validate_domain_name("-home.example.com").is_err());
        assert!(validate_domain_name("home.*.example.com").is_err());
        assert!(validate_domain_name("*home.example.com").is_err());
        assert!(validate_domain_name("home.example.com/x").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DdnsExitCode::CleanShutdown as u8, 0);
        assert_eq!(DdnsExitCode::ConfigError as u8, 1);
        assert_eq!(DdnsExitCode::RuntimeError as u8, 2);
    }
}
