//! External inference: providers, rate limiting, retries, prompts and
//! reply parsing.
//!
//! One [`RateLimitedClient`] wraps one [`InferenceProvider`] and is shared
//! (behind an `Arc`) by every predictor of a run, so the request rate is
//! bounded process-wide without any global state.
//!
//! # Providers
//!
//! - **Gemini** - `generateContent` REST API (requires `GEMINI_API_KEY`)
//! - **Mock** - scripted replies for tests and offline runs
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use joinbench::llm::{ClientConfig, GeminiProvider, RateLimitedClient};
//!
//! let config = ClientConfig::from_env().unwrap();
//! let provider = GeminiProvider::from_config(&config).unwrap();
//! let client = Arc::new(RateLimitedClient::new(provider, &config));
//! let text = client.generate_text("Reply with {}").unwrap();
//! ```

mod client;
mod gemini;
mod limiter;
mod mock;
mod parse;
mod prompts;
mod provider;

pub use client::{
    Backoff, ClientConfig, DEFAULT_MAX_RETRIES, DEFAULT_MODEL, DEFAULT_RPM, DEFAULT_TIMEOUT,
    RateLimitedClient,
};
pub use gemini::GeminiProvider;
pub use limiter::{Clock, ManualClock, RateLimiter, SystemClock, WINDOW};
pub use mock::MockProvider;
pub use parse::{
    ChoiceAnswer, MAX_REASON_CHARS, PairAnswer, extract_json_block, parse_choice_answer,
    parse_pair_answer,
};
pub use prompts::{ColumnEvidence, JSON_REMINDER, candidate_prompt, pair_prompt, reinforced};
pub use provider::{InferenceProvider, ProviderFailure};
