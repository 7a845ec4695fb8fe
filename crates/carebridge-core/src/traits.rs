// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inference engine trait seam.
//!
//! The orchestrator consumes the external text-completion engine exclusively
//! through [`InferenceEngine`], so tests can substitute a scripted mock and
//! the HTTP client stays an implementation detail of `carebridge-inference`.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::CareError;
use crate::types::{Completion, ContextEntry, EngineChunk};

/// A boxed stream of incremental completion fragments.
pub type EngineStream = Pin<Box<dyn Stream<Item = Result<EngineChunk, CareError>> + Send>>;

/// Black-box text-completion engine reachable over HTTP.
///
/// Both operations format the context window into a single prompt (the
/// implementation's concern) and return output stripped of role-delimiter
/// control tokens. Connectivity failures surface as
/// [`CareError::EngineUnavailable`]; malformed or empty responses as
/// [`CareError::EngineError`].
#[async_trait]
pub trait InferenceEngine: Send + Sync + 'static {
    /// Synchronous whole-response completion.
    async fn complete(&self, context: &[ContextEntry]) -> Result<Completion, CareError>;

    /// Streamed completion. Fragments arrive in engine order; the stream ends
    /// with a terminal chunk carrying `stop = true`.
    ///
    /// Cancellation is cooperative and best-effort: dropping the stream drops
    /// the underlying request, but the engine is not guaranteed to have
    /// stopped computing remotely.
    async fn stream(&self, context: &[ContextEntry]) -> Result<EngineStream, CareError>;
}
