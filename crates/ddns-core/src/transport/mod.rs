//! Backoff-retrying HTTP transport
//!
//! Every outbound request (DNS provider API, public IP echo service) goes
//! through [`HttpTransport::execute`]. A request is attempted up to
//! `max_attempts` times; only transport-level failures (connect errors,
//! timeouts, broken bodies) are retried.
//!
//! ## Status codes are not failures
//!
//! A response with any HTTP status, including 404 or 5xx, is a successful
//! transport result and is returned to the caller untouched. Interpreting
//! the status is the caller's job.
//!
//! ## Delay schedule
//!
//! ```text
//! attempt 1 ── fail ── sleep(1s + 10%) ── attempt 2 ── fail ── sleep(2s + 10%) ── attempt 3
//! ```
//!
//! The base delay grows by `backoff_factor` after every failure and is
//! capped at `max_delay`. Jitter is `jitter_factor` of the base delay that
//! is being slept.

use crate::config::TransportConfig;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential delay schedule for one request
#[derive(Debug, Clone)]
pub struct Backoff {
    delay_ms: u64,
    max_delay_ms: u64,
    factor: f64,
    jitter_factor: f64,
}

impl Backoff {
    /// Current base delay (before jitter)
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Sleep to apply before the next retry; advances the schedule
    pub fn next_sleep(&mut self) -> Duration {
        let jitter_ms = (self.delay_ms as f64 * self.jitter_factor).round() as u64;
        let sleep = Duration::from_millis(self.delay_ms.saturating_add(jitter_ms));

        let grown = (self.delay_ms as f64 * self.factor).round();
        self.delay_ms = if grown >= self.max_delay_ms as f64 {
            self.max_delay_ms
        } else {
            grown as u64
        };

        sleep
    }
}

/// Bounded retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    factor: f64,
    jitter_factor: f64,
}

impl RetryPolicy {
    /// Build the policy from configuration
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay_ms: config.initial_delay_ms.min(config.max_delay_ms),
            max_delay_ms: config.max_delay_ms,
            factor: config.backoff_factor,
            jitter_factor: config.jitter_factor,
        }
    }

    /// A fresh delay schedule
    pub fn backoff(&self) -> Backoff {
        Backoff {
            delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            factor: self.factor,
            jitter_factor: self.jitter_factor,
        }
    }

    /// Run `attempt` until it succeeds or the attempts are used up
    ///
    /// # Parameters
    ///
    /// - `operation`: Short description used in logs and in the error
    /// - `attempt`: Produces one attempt per call
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: The first successful attempt
    /// - `Err(Error::TransportExhausted)`: Every attempt failed
    pub async fn execute<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let mut backoff = self.backoff();
        let mut last_error = String::new();

        for attempt_no in 1..=self.max_attempts {
            match attempt().await {
                Ok(value) => {
                    if attempt_no > 1 {
                        debug!("{} succeeded on attempt {}", operation, attempt_no);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();

                    if attempt_no < self.max_attempts {
                        let sleep = backoff.next_sleep();
                        warn!(
                            "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                            operation, attempt_no, self.max_attempts, last_error, sleep
                        );
                        tokio::time::sleep(sleep).await;
                    } else {
                        warn!(
                            "{} failed (attempt {}/{}): {}",
                            operation, attempt_no, self.max_attempts, last_error
                        );
                    }
                }
            }
        }

        Err(Error::transport_exhausted(
            operation,
            self.max_attempts,
            last_error,
        ))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

/// A fully-read HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Response status
    pub status: reqwest::StatusCode,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON
    ///
    /// Decode failures are reported as [`Error::MalformedResponse`], never
    /// as an empty value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::malformed(format!("status {}: {}", self.status.as_u16(), e))
        })
    }
}

/// HTTP client wrapped in a [`RetryPolicy`]
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpTransport {
    /// Build a transport with the configured per-request timeout
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, RetryPolicy::from_config(config)))
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Execute a request with retries
    ///
    /// `build` is called once per attempt so that every attempt sends a
    /// fresh request.
    ///
    /// # Returns
    ///
    /// - `Ok(HttpResponse)`: A response was received (any status)
    /// - `Err(Error::TransportExhausted)`: No attempt produced a response
    pub async fn execute<F>(&self, operation: &str, build: F) -> Result<HttpResponse>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let client = &self.client;
        let build = &build;

        self.policy
            .execute(operation, move || async move {
                let response = build(client).send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>(HttpResponse { status, body })
            })
            .await
    }
}
