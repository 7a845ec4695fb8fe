// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for streaming completions.
//!
//! Converts a reqwest response byte stream into [`EngineChunk`] values using
//! the `eventsource-stream` crate. The engine emits unnamed `data:` events,
//! each carrying one JSON [`StreamChunk`]; the terminal chunk sets `stop`.

use carebridge_core::{CareError, EngineChunk, EngineStream};
use eventsource_stream::Eventsource;
use futures::stream::StreamExt;

use crate::prompt::strip_control_tokens;
use crate::types::StreamChunk;

/// Parses a streaming `/completion` response into engine chunks.
///
/// Fragments have control tokens stripped but are otherwise passed through
/// verbatim, whitespace included. Transport or parse failures mid-stream
/// surface as [`CareError::EngineError`]; by then the request cannot be
/// retried because earlier fragments may already have been relayed.
pub fn parse_completion_stream(response: reqwest::Response) -> EngineStream {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                if event.data.trim().is_empty() {
                    return None;
                }
                match serde_json::from_str::<StreamChunk>(&event.data) {
                    Ok(chunk) => Some(Ok(EngineChunk {
                        delta: if chunk.content.is_empty() {
                            chunk.content
                        } else {
                            sanitize_fragment(&chunk.content)
                        },
                        stop: chunk.stop,
                        token_count: chunk.tokens_predicted,
                    })),
                    Err(e) => Some(Err(CareError::EngineError {
                        message: format!("malformed stream chunk: {e}"),
                        source: Some(Box::new(e)),
                    })),
                }
            }
            Err(e) => Some(Err(CareError::EngineError {
                message: format!("stream transport error: {e}"),
                source: Some(Box::new(e)),
            })),
        }
    });

    Box::pin(mapped)
}

/// Strip control tokens from a fragment without trimming the whitespace
/// that joins it to its neighbours.
fn sanitize_fragment(fragment: &str) -> String {
    if fragment.contains("<|") {
        strip_control_tokens(fragment)
    } else {
        fragment.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fragments_keep_their_whitespace() {
        assert_eq!(sanitize_fragment(" and then"), " and then");
    }

    #[test]
    fn control_tokens_are_removed() {
        assert_eq!(sanitize_fragment("<|end|>"), "");
    }

    #[test]
    fn stream_chunk_parses_terminal_payload() {
        let chunk: StreamChunk =
            serde_json::from_str(r#"{"content":"","stop":true,"tokens_predicted":42}"#).unwrap();
        assert!(chunk.stop);
        assert_eq!(chunk.tokens_predicted, Some(42));
    }
}
