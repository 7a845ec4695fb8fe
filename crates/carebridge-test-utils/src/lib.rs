// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles: a scripted [`MockEngine`] standing in for the HTTP
//! inference client, and a [`TestHarness`] that provisions a temporary
//! SQLite-backed [`ConversationStore`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use carebridge_config::CareBridgeConfig;
use carebridge_core::{
    CareError, Completion, ContextEntry, EngineChunk, EngineStream, InferenceEngine,
};
use carebridge_storage::{ConversationStore, Database};
use futures::StreamExt;
use tempfile::TempDir;

/// One scripted engine interaction.
pub enum Script {
    /// Complete (or stream) this text successfully.
    Reply(String),
    /// Fail the call before producing any output.
    Fail(CareError),
    /// Stream `prefix` fragments, then fail mid-stream.
    FailMidStream { prefix: String, error: CareError },
}

/// Scripted [`InferenceEngine`] double.
///
/// Responses are consumed front to back; an exhausted script is a test bug
/// and surfaces as an internal error. Streamed replies are split on word
/// boundaries with an optional per-fragment delay so cancellation tests have
/// a window to interrupt.
pub struct MockEngine {
    script: Mutex<VecDeque<Script>>,
    fragment_delay: Duration,
    calls: AtomicUsize,
    last_context: Mutex<Option<Vec<ContextEntry>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fragment_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.push(Script::Reply(text.into()));
    }

    pub fn push(&self, script: Script) {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(script);
    }

    /// Number of engine invocations so far (complete and stream combined).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The context window the engine saw on its most recent invocation.
    pub fn last_context(&self) -> Option<Vec<ContextEntry>> {
        self.last_context
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn next_script(&self, context: &[ContextEntry]) -> Result<Script, CareError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap_or_else(|p| p.into_inner()) =
            Some(context.to_vec());
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .ok_or_else(|| CareError::Internal("mock engine script exhausted".into()))
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a reply into word-boundary fragments, separators attached.
fn fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

fn token_estimate(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

fn chunk_stream(
    chunks: Vec<Result<EngineChunk, CareError>>,
    delay: Duration,
) -> EngineStream {
    Box::pin(futures::stream::iter(chunks).then(move |chunk| async move {
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
        chunk
    }))
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn complete(&self, context: &[ContextEntry]) -> Result<Completion, CareError> {
        match self.next_script(context)? {
            Script::Reply(text) => Ok(Completion {
                token_count: token_estimate(&text),
                latency_ms: 1,
                text,
            }),
            Script::Fail(error) | Script::FailMidStream { error, .. } => Err(error),
        }
    }

    async fn stream(&self, context: &[ContextEntry]) -> Result<EngineStream, CareError> {
        match self.next_script(context)? {
            Script::Reply(text) => {
                let mut chunks: Vec<Result<EngineChunk, CareError>> = fragments(&text)
                    .into_iter()
                    .map(|delta| {
                        Ok(EngineChunk {
                            delta,
                            stop: false,
                            token_count: None,
                        })
                    })
                    .collect();
                chunks.push(Ok(EngineChunk {
                    delta: String::new(),
                    stop: true,
                    token_count: Some(token_estimate(&text)),
                }));
                Ok(chunk_stream(chunks, self.fragment_delay))
            }
            Script::Fail(error) => Err(error),
            Script::FailMidStream { prefix, error } => {
                let mut chunks: Vec<Result<EngineChunk, CareError>> = fragments(&prefix)
                    .into_iter()
                    .map(|delta| {
                        Ok(EngineChunk {
                            delta,
                            stop: false,
                            token_count: None,
                        })
                    })
                    .collect();
                chunks.push(Err(error));
                Ok(chunk_stream(chunks, self.fragment_delay))
            }
        }
    }
}

/// Temporary-database fixture. Dropping the harness deletes the database.
pub struct TestHarness {
    pub store: ConversationStore,
    pub config: CareBridgeConfig,
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(CareBridgeConfig::default()).await
    }

    pub async fn with_config(config: CareBridgeConfig) -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let path = dir.path().join("carebridge-test.db");
        let db = Database::open(path.to_str().unwrap_or_else(|| panic!("non-utf8 temp path")))
            .await
            .unwrap_or_else(|e| panic!("open database: {e}"));
        let store = ConversationStore::new(
            db,
            config.limits.clone(),
            config.safety.greeting_message.clone(),
        );
        Self {
            store,
            config,
            _dir: dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebridge_core::Role;

    #[tokio::test]
    async fn mock_engine_replays_script_in_order() {
        let engine = MockEngine::new();
        engine.push_reply("first");
        engine.push_reply("second");

        let context = vec![ContextEntry {
            role: Role::User,
            content: "hi".into(),
        }];
        assert_eq!(engine.complete(&context).await.unwrap().text, "first");
        assert_eq!(engine.complete(&context).await.unwrap().text, "second");
        assert!(engine.complete(&context).await.is_err());
        assert_eq!(engine.call_count(), 3);
    }

    #[tokio::test]
    async fn mock_engine_stream_reassembles_text() {
        let engine = MockEngine::new();
        engine.push_reply("take some rest");

        let mut stream = engine.stream(&[]).await.unwrap();
        let mut text = String::new();
        let mut saw_stop = false;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            text.push_str(&chunk.delta);
            saw_stop |= chunk.stop;
        }
        assert_eq!(text, "take some rest");
        assert!(saw_stop);
    }

    #[tokio::test]
    async fn harness_provisions_working_store() {
        let harness = TestHarness::new().await;
        let conversation = harness.store.create_session(None).await.unwrap();
        assert!(harness
            .store
            .get_conversation(&conversation.id)
            .await
            .unwrap()
            .is_some());
    }
}
