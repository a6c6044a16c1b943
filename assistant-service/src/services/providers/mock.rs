//! Mock provider for testing.

use super::{GenerationParams, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scriptable text provider. Replays queued responses in order and echoes
/// the prompt once the queue is empty; counts calls so tests can assert
/// that the rule path short-circuited the LLM.
#[derive(Default)]
pub struct MockTextProvider {
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    fail_all: bool,
}

impl MockTextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails, for exercising fallback paths.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn with_responses(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn push_response(&self, response: Result<String, ProviderError>) {
        self.responses
            .lock()
            .expect("mock response queue poisoned")
            .push_back(response);
    }

    /// Number of `generate` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_all {
            return Err(ProviderError::ApiError("mock provider failure".to_string()));
        }

        let scripted = self
            .responses
            .lock()
            .expect("mock response queue poisoned")
            .pop_front();

        let text = match scripted {
            Some(Ok(text)) => text,
            Some(Err(e)) => return Err(e),
            None => default_response(prompt, params),
        };

        Ok(ProviderResponse {
            text: Some(text),
            input_tokens: prompt.len() as i32 / 4,
            output_tokens: 10,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Unscripted behavior: structured-output requests get a minimal response
/// matching their schema (verdicts approve, classifications give up), plain
/// text requests get the prompt echoed back.
fn default_response(prompt: &str, params: &GenerationParams) -> String {
    match &params.output_schema {
        Some(schema) if schema.contains("\"valid\"") => r#"{"valid":true}"#.to_string(),
        Some(schema) if schema.contains("\"kind\"") => {
            r#"{"kind":"unknown","slots":{}}"#.to_string()
        }
        _ => format!("Mock response for: {}", prompt),
    }
}
