// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the engine's `/completion` endpoint.

use serde::{Deserialize, Serialize};

/// Request body for `POST /completion`.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// Fully rendered prompt: system instruction, role-labelled turns, and
    /// the trailing assistant cue.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub n_predict: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Stop sequences that end generation before the limit.
    pub stop: Vec<String>,
    /// Whether the engine should stream the response as SSE.
    pub stream: bool,
}

/// Response body for a non-streaming completion.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tokens_predicted: u32,
}

/// One SSE `data:` payload of a streaming completion.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub content: String,
    /// True on the terminal chunk.
    #[serde(default)]
    pub stop: bool,
    /// Final token count; the engine reports it on the terminal chunk only.
    #[serde(default)]
    pub tokens_predicted: Option<u32>,
}
