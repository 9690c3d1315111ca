//! Rate-limited, retrying front end over an [`InferenceProvider`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{JoinBenchError, Result};

use super::limiter::{Clock, RateLimiter, SystemClock, WINDOW};
use super::provider::{InferenceProvider, ProviderFailure};

/// Default requests admitted per minute.
pub const DEFAULT_RPM: usize = 15;

/// Default total attempts per request.
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Upper bound on computed backoff, before jitter.
const MAX_BACKOFF_SECS: f64 = 60.0;

/// Configuration for [`RateLimitedClient`] and its provider.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Requests admitted per trailing minute.
    pub rpm: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Total attempts per request, first one included.
    pub max_retries: u32,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rpm: DEFAULT_RPM,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl ClientConfig {
    /// Read `GEMINI_API_KEY` (required), `GEMINI_MODEL` and `JOINBENCH_RPM`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            JoinBenchError::Config("GEMINI_API_KEY environment variable not set".to_string())
        })?;
        let mut config = Self::default().with_api_key(api_key);
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Ok(rpm) = std::env::var("JOINBENCH_RPM") {
            config.rpm = rpm.trim().parse().map_err(|_| {
                JoinBenchError::Config(format!("JOINBENCH_RPM is not a positive integer: {}", rpm))
            })?;
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_rpm(mut self, rpm: usize) -> Self {
        self.rpm = rpm;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Exponential backoff schedule with uniform jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the second attempt, in seconds.
    pub base: f64,
    /// Upper bound of the added jitter, in seconds.
    pub jitter: f64,
}

impl Backoff {
    pub const QUOTA: Backoff = Backoff {
        base: 5.0,
        jitter: 1.5,
    };

    pub const TRANSIENT: Backoff = Backoff {
        base: 2.0,
        jitter: 1.0,
    };

    /// Deterministic part of the delay after the 1-based `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64((self.base * 2f64.powi(exp)).min(MAX_BACKOFF_SECS))
    }

    /// Delay including jitter in `[0, jitter)`.
    pub fn jittered(&self, attempt: u32) -> Duration {
        self.delay(attempt) + Duration::from_secs_f64(fastrand::f64() * self.jitter)
    }
}

/// The shared inference client.
///
/// Every request first takes a slot from the limiter, so one client bounds
/// the request rate of every predictor that holds it.
pub struct RateLimitedClient {
    provider: Box<dyn InferenceProvider>,
    limiter: RateLimiter,
    max_retries: u32,
}

impl RateLimitedClient {
    pub fn new(provider: impl InferenceProvider + 'static, config: &ClientConfig) -> Self {
        Self::with_clock(provider, config, Arc::new(SystemClock))
    }

    /// Use `clock` for both admission and backoff sleeps.
    pub fn with_clock(
        provider: impl InferenceProvider + 'static,
        config: &ClientConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider: Box::new(provider),
            limiter: RateLimiter::with_clock(config.rpm, WINDOW, clock),
            max_retries: config.max_retries.max(1),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Generate text for `prompt`, retrying quota and transient failures.
    ///
    /// Blank replies fail with [`JoinBenchError::MalformedResponse`] without
    /// a retry here. Rejections fail immediately.
    pub fn generate_text(&self, prompt: &str) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.limiter.acquire();

            let failure = match self.provider.generate(prompt) {
                Ok(text) if text.trim().is_empty() => {
                    return Err(JoinBenchError::MalformedResponse("empty response".to_string()));
                }
                Ok(text) => return Ok(text),
                Err(failure) => failure,
            };

            let delay = match failure {
                ProviderFailure::Rejected(message) => {
                    return Err(JoinBenchError::NonRetryable(message));
                }
                ProviderFailure::Quota { message, .. } if attempt >= self.max_retries => {
                    return Err(JoinBenchError::QuotaExhausted {
                        attempts: attempt,
                        message,
                    });
                }
                ProviderFailure::Transient(message) if attempt >= self.max_retries => {
                    return Err(JoinBenchError::Transient {
                        attempts: attempt,
                        message,
                    });
                }
                ProviderFailure::Quota {
                    retry_after: Some(delay),
                    ..
                } => delay,
                ProviderFailure::Quota { .. } => Backoff::QUOTA.jittered(attempt),
                ProviderFailure::Transient(ref message) => {
                    debug!(attempt, message = %message, "transient inference failure");
                    Backoff::TRANSIENT.jittered(attempt)
                }
            };

            warn!(
                provider = self.provider.name(),
                attempt,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                "inference request failed, backing off"
            );
            self.limiter.clock().sleep(delay);
        }
    }
}
