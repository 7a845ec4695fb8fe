// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the text-completion inference engine.
//!
//! Provides [`HttpEngine`], the production [`InferenceEngine`] backed by a
//! llama.cpp-style `/completion` endpoint. Handles request construction,
//! prompt rendering, streaming SSE responses, and transient error retry.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use carebridge_config::EngineConfig;
use carebridge_core::{CareError, Completion, ContextEntry, EngineStream, InferenceEngine};
use tracing::{debug, warn};

use crate::prompt::{render_prompt, strip_control_tokens, STOP_SEQUENCES};
use crate::sse;
use crate::types::{CompletionRequest, CompletionResponse};

/// HTTP adapter for the inference engine.
///
/// Connectivity failures and 5xx responses are [`CareError::EngineUnavailable`]
/// and are retried up to `max_retries` times with a 1-second delay. Any other
/// failure (4xx, malformed body, empty completion) is [`CareError::EngineError`]
/// and is never retried.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    max_retries: u32,
    system_prompt: Option<String>,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, CareError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CareError::Config(format!("failed to build HTTP client: {e}")))?;

        let system_prompt = if config.system_prompt.trim().is_empty() {
            None
        } else {
            Some(config.system_prompt.clone())
        };

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            max_retries: config.max_retries,
            system_prompt,
        })
    }

    /// Replaces the system instruction. `None` sends bare turns, which fast
    /// mode uses.
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    fn build_request(&self, context: &[ContextEntry], stream: bool) -> CompletionRequest {
        CompletionRequest {
            prompt: render_prompt(self.system_prompt.as_deref(), context),
            n_predict: self.max_tokens,
            temperature: self.temperature,
            stop: STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            stream,
        }
    }

    fn completion_url(&self) -> String {
        format!("{}/completion", self.base_url)
    }

    /// Sends the request once, classifying failures. `Ok` carries the
    /// successful response; transport errors and 5xx become
    /// `EngineUnavailable` so the caller's retry loop can distinguish them.
    async fn send_once(&self, request: &CompletionRequest) -> Result<reqwest::Response, CareError> {
        let response = self
            .client
            .post(self.completion_url())
            .json(request)
            .send()
            .await
            .map_err(|e| CareError::EngineUnavailable {
                message: format!("engine request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "engine response received");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(CareError::EngineUnavailable {
                message: format!("engine returned {status}: {body}"),
                source: None,
            })
        } else {
            Err(CareError::EngineError {
                message: format!("engine returned {status}: {body}"),
                source: None,
            })
        }
    }

    /// Runs `send_once` with the bounded retry policy for
    /// `EngineUnavailable` failures.
    async fn send_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> Result<reqwest::Response, CareError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying engine request after transient failure");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            match self.send_once(request).await {
                Ok(response) => return Ok(response),
                Err(e @ CareError::EngineUnavailable { .. }) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| CareError::EngineUnavailable {
            message: "engine request failed after retries".into(),
            source: None,
        }))
    }
}

#[async_trait]
impl InferenceEngine for HttpEngine {
    async fn complete(&self, context: &[ContextEntry]) -> Result<Completion, CareError> {
        let request = self.build_request(context, false);
        let started = Instant::now();

        let response = self.send_with_retry(&request).await?;
        let body = response.text().await.map_err(|e| CareError::EngineError {
            message: format!("failed to read engine response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        let parsed: CompletionResponse =
            serde_json::from_str(&body).map_err(|e| CareError::EngineError {
                message: format!("failed to parse engine response: {e}"),
                source: Some(Box::new(e)),
            })?;

        let text = strip_control_tokens(&parsed.content);
        if text.is_empty() {
            return Err(CareError::EngineError {
                message: "engine returned an empty completion".into(),
                source: None,
            });
        }

        Ok(Completion {
            text,
            token_count: parsed.tokens_predicted,
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn stream(&self, context: &[ContextEntry]) -> Result<EngineStream, CareError> {
        let request = self.build_request(context, true);
        let response = self.send_with_retry(&request).await?;
        Ok(sse::parse_completion_stream(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::Role;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_engine(base_url: &str) -> HttpEngine {
        let config = EngineConfig {
            base_url: base_url.to_string(),
            max_tokens: 64,
            temperature: 0.7,
            request_timeout_secs: 5,
            max_retries: 1,
            system_prompt: "You are a clinic assistant.".to_string(),
        };
        HttpEngine::new(&config).unwrap()
    }

    fn test_context() -> Vec<ContextEntry> {
        vec![ContextEntry {
            role: Role::User,
            content: "I have a mild headache".to_string(),
        }]
    }

    #[tokio::test]
    async fn complete_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .and(body_partial_json(serde_json::json!({ "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": " Rest and hydrate. <|end|>",
                "tokens_predicted": 7
            })))
            .mount(&server)
            .await;

        let completion = test_engine(&server.uri())
            .complete(&test_context())
            .await
            .unwrap();
        assert_eq!(completion.text, "Rest and hydrate.");
        assert_eq!(completion.token_count, 7);
    }

    #[tokio::test]
    async fn complete_retries_on_5xx_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "Recovered",
                "tokens_predicted": 2
            })))
            .mount(&server)
            .await;

        let completion = test_engine(&server.uri())
            .complete(&test_context())
            .await
            .unwrap();
        assert_eq!(completion.text, "Recovered");
    }

    #[tokio::test]
    async fn complete_does_not_retry_4xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_engine(&server.uri())
            .complete(&test_context())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "engine_error");
    }

    #[tokio::test]
    async fn complete_rejects_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": "  <|end|>  ",
                "tokens_predicted": 0
            })))
            .mount(&server)
            .await;

        let err = test_engine(&server.uri())
            .complete(&test_context())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "engine_error");
    }

    #[tokio::test]
    async fn connect_failure_is_engine_unavailable() {
        // Nothing is listening on this port.
        let engine = test_engine("http://127.0.0.1:9");
        let err = engine.complete(&test_context()).await.unwrap_err();
        assert_eq!(err.error_code(), "engine_unavailable");
    }

    #[tokio::test]
    async fn stream_yields_fragments_then_terminal_chunk() {
        let server = MockServer::start().await;
        let sse_body = concat!(
            "data: {\"content\":\"Take\",\"stop\":false}\n\n",
            "data: {\"content\":\" rest\",\"stop\":false}\n\n",
            "data: {\"content\":\"\",\"stop\":true,\"tokens_predicted\":9}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/completion"))
            .and(body_partial_json(serde_json::json!({ "stream": true })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_raw(sse_body, "text/event-stream"),
            )
            .mount(&server)
            .await;

        let mut stream = test_engine(&server.uri())
            .stream(&test_context())
            .await
            .unwrap();

        let mut text = String::new();
        let mut terminal = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            text.push_str(&chunk.delta);
            if chunk.stop {
                terminal = Some(chunk);
            }
        }
        assert_eq!(text, "Take rest");
        assert_eq!(terminal.unwrap().token_count, Some(9));
    }
}
