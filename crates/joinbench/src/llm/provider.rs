//! Inference provider trait: one raw request, no retries.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Why a single provider call failed.
///
/// The variant decides the retry policy; the message is kept only to be
/// surfaced when retries run out.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderFailure {
    /// Rate or quota limit. `retry_after` is the server-suggested delay.
    Quota {
        retry_after: Option<Duration>,
        message: String,
    },
    /// Timeout, connection failure or a temporary server error.
    Transient(String),
    /// Anything else the service refused.
    Rejected(String),
}

impl ProviderFailure {
    pub fn quota(message: impl Into<String>) -> Self {
        Self::Quota {
            retry_after: None,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Quota { message, .. } => message,
            Self::Transient(message) | Self::Rejected(message) => message,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quota {
                retry_after: Some(delay),
                message,
            } => write!(f, "quota exceeded (retry in {:?}): {}", delay, message),
            Self::Quota { message, .. } => write!(f, "quota exceeded: {}", message),
            Self::Transient(message) => write!(f, "transient failure: {}", message),
            Self::Rejected(message) => write!(f, "rejected: {}", message),
        }
    }
}

/// A text-generation backend.
///
/// Implementations perform exactly one request per call. Rate limiting and
/// retries live in [`RateLimitedClient`](super::RateLimitedClient).
pub trait InferenceProvider: Send + Sync {
    /// Send `prompt` and return the generated text.
    fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderFailure>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

impl<P: InferenceProvider + ?Sized> InferenceProvider for Arc<P> {
    fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderFailure> {
        (**self).generate(prompt)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
