//! Scripted provider for tests and offline runs.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::provider::{InferenceProvider, ProviderFailure};

type Reply = std::result::Result<String, ProviderFailure>;
type Responder = Box<dyn Fn(&str) -> Reply + Send + Sync>;

/// Provider that replays scripted replies and records every prompt.
///
/// Once the script runs out, the fallback responder answers. The default
/// fallback returns an empty JSON object.
pub struct MockProvider {
    script: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    fallback: Responder,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fallback: Box::new(|_| Ok("{}".to_string())),
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, failure: ProviderFailure) -> Self {
        self.push(Err(failure));
        self
    }

    /// Answer with `responder` once the script is exhausted.
    pub fn with_fallback<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Reply + Send + Sync + 'static,
    {
        self.fallback = Box::new(responder);
        self
    }

    fn push(&self, reply: Reply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceProvider for MockProvider {
    fn generate(&self, prompt: &str) -> Reply {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(reply) => reply,
            None => (self.fallback)(prompt),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_then_fallback() {
        let mock = MockProvider::new()
            .with_reply("first")
            .with_failure(ProviderFailure::Transient("503".into()))
            .with_fallback(|p| Ok(format!("echo:{}", p.len())));

        assert_eq!(mock.generate("a").unwrap(), "first");
        assert!(mock.generate("b").is_err());
        assert_eq!(mock.generate("abc").unwrap(), "echo:3");
        assert_eq!(mock.prompts(), vec!["a", "b", "abc"]);
        assert_eq!(mock.call_count(), 3);
    }
}
