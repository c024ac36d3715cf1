//! HTTP fetcher implementation
//!
//! This module handles every HTTP request the pipeline makes, including:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests with a per-attempt timeout
//! - Retry with exponential, jittered, capped backoff
//! - Error classification into `FetchErrorKind`

use crate::config::{Config, FetcherConfig};
use crate::FetchErrorKind;
use rand::Rng;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A 2xx response was received
    Success {
        /// Response body, verbatim
        body: String,
    },

    /// Every attempt failed
    Failure {
        /// Classification of the failure
        kind: FetchErrorKind,
        /// Description of the last error seen
        message: String,
    },
}

/// A fetch outcome together with what it took to get there
#[derive(Debug, Clone)]
pub struct FetchTrace {
    /// The final outcome
    pub outcome: FetchOutcome,

    /// Number of requests sent
    pub attempts: u32,

    /// Backoff sleeps taken between attempts, in order
    pub backoffs: Vec<Duration>,
}

/// Retry policy shared by every fetch
///
/// Backoff before retry `n` (0-based) is `base_delay * 2^n`, plus up to
/// `jitter * delay` of random extra time, capped at `max_delay`. Jitter is
/// clamped to 0.0 - 1.0 (non-finite values disable it), so the resulting
/// sequence never decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per fetch, including the first
    pub max_attempts: u32,

    /// Backoff before the first retry
    pub base_delay: Duration,

    /// Upper bound on any single backoff
    pub max_delay: Duration,

    /// Random extra delay as a fraction of the backoff (0.0 - 1.0)
    pub jitter: f64,
}

impl RetryPolicy {
    /// Builds a policy from the fetcher configuration
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: config.jitter,
        }
    }

    /// Returns the backoff to sleep after failed attempt `retry` (0-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);

        let jitter = if self.jitter.is_finite() {
            self.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let jittered = if jitter > 0.0 {
            let extra = rand::thread_rng().gen_range(0.0..=jitter);
            delay.mul_f64(1.0 + extra)
        } else {
            delay
        };

        jittered.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetcherConfig::default())
    }
}

/// Failure of a single request attempt
#[derive(Debug)]
struct AttemptError {
    kind: FetchErrorKind,
    message: String,
}

impl AttemptError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = error.status() {
            FetchErrorKind::HttpStatusError(status.as_u16())
        } else {
            FetchErrorKind::ConnectionError
        };

        Self {
            kind,
            message: error.to_string(),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client owns the connection pool; clone it to share the pool across
/// concurrent fetches.
///
/// # Example
///
/// ```no_run
/// use catalog_ripple::config::Config;
/// use catalog_ripple::pipeline::build_http_client;
///
/// let config = Config::for_site("https://example.com");
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.value.as_str())
        .connect_timeout(Duration::from_secs(config.fetcher.connect_timeout_secs))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over a shared client, retrying per the policy
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl PageFetcher {
    /// Creates a fetcher over an existing client
    pub fn new(client: Client, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            client,
            policy,
            timeout,
        }
    }

    /// Creates a fetcher using the configured policy and timeout
    pub fn from_config(client: Client, config: &FetcherConfig) -> Self {
        Self::new(
            client,
            RetryPolicy::from_config(config),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// The per-attempt timeout in use
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetches a URL with the full configured retry policy
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        self.fetch_with(url, self.policy.max_attempts, self.timeout)
            .await
    }

    /// Fetches a URL with an explicit attempt budget and per-attempt timeout
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Return body |
    /// | HTTP non-2xx | Retry with backoff |
    /// | Timeout | Retry with backoff |
    /// | Connection / transport error | Retry with backoff |
    /// | Attempts exhausted | `Failure` with `ExhaustedRetries` |
    pub async fn fetch_with(
        &self,
        url: &str,
        max_attempts: u32,
        timeout: Duration,
    ) -> FetchOutcome {
        self.fetch_traced(url, max_attempts, timeout).await.outcome
    }

    /// Like `fetch_with`, but also reports attempts and backoff sleeps
    pub async fn fetch_traced(
        &self,
        url: &str,
        max_attempts: u32,
        timeout: Duration,
    ) -> FetchTrace {
        let max_attempts = max_attempts.max(1);
        let mut backoffs = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);

            let error = match self.attempt(url, timeout).await {
                Ok(body) => {
                    if attempt > 1 {
                        tracing::info!("Fetched {} on attempt {}", url, attempt);
                    }
                    return FetchTrace {
                        outcome: FetchOutcome::Success { body },
                        attempts: attempt,
                        backoffs,
                    };
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                tracing::debug!(
                    "Giving up on {} after {} attempts: {}",
                    url,
                    attempt,
                    error.message
                );
                let kind = if attempt > 1 {
                    FetchErrorKind::ExhaustedRetries {
                        attempts: attempt,
                        last: Box::new(error.kind),
                    }
                } else {
                    error.kind
                };

                return FetchTrace {
                    outcome: FetchOutcome::Failure {
                        kind,
                        message: error.message,
                    },
                    attempts: attempt,
                    backoffs,
                };
            }

            let delay = self.policy.backoff(attempt - 1);
            tracing::warn!(
                "Fetch of {} failed ({}), retrying in {:?}",
                url,
                error.kind,
                delay
            );
            backoffs.push(delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Sends one GET and reads the body
    async fn attempt(&self, url: &str, timeout: Duration) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError {
                kind: FetchErrorKind::HttpStatusError(status.as_u16()),
                message: format!("HTTP {}", status),
            });
        }

        response.text().await.map_err(AttemptError::from_reqwest)
    }
}
