// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session cancellation handles for in-flight generations.
//!
//! One entry per session token, alive only while a streaming turn is in
//! flight. The registry is injected into the orchestrator and the gateway
//! rather than living in a module global, so tests can build isolated
//! instances. Entries carry a generation sequence number: two concurrent
//! turns on the same session are not serialized, and the sequence stops a
//! finished first turn from evicting the second turn's handle.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for one registered generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub token: CancellationToken,
    seq: u64,
}

/// Registry mapping session tokens to active generation cancellation handles.
#[derive(Debug, Default)]
pub struct GenerationRegistry {
    entries: DashMap<String, Generation>,
    next_seq: AtomicU64,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new generation for a session, displacing any stale entry.
    pub fn begin(&self, session_id: &str) -> Generation {
        let generation = Generation {
            token: CancellationToken::new(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.entries
            .insert(session_id.to_string(), generation.clone());
        generation
    }

    /// Remove a generation's entry, unless a newer turn has replaced it.
    pub fn finish(&self, session_id: &str, generation: &Generation) {
        self.entries
            .remove_if(session_id, |_, current| current.seq == generation.seq);
    }

    /// Cancel the active generation for a session, if any. Idempotent:
    /// cancelling a session with no in-flight generation is a no-op.
    pub fn cancel(&self, session_id: &str) {
        if let Some((_, generation)) = self.entries.remove(session_id) {
            debug!(session_id = %session_id, "cancelling in-flight generation");
            generation.token.cancel();
        }
    }

    /// Number of in-flight generations, for shutdown logging.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_cancel_fires_token() {
        let registry = GenerationRegistry::new();
        let generation = registry.begin("s1");
        assert!(!generation.token.is_cancelled());

        registry.cancel("s1");
        assert!(generation.token.is_cancelled());
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn cancel_without_generation_is_a_noop() {
        let registry = GenerationRegistry::new();
        registry.cancel("missing");
        registry.cancel("missing");
    }

    #[test]
    fn finish_does_not_evict_newer_generation() {
        let registry = GenerationRegistry::new();
        let first = registry.begin("s1");
        let second = registry.begin("s1");

        // The first turn concludes after being displaced.
        registry.finish("s1", &first);
        assert_eq!(registry.active_count(), 1);

        // The second turn's handle is still the one cancel reaches.
        registry.cancel("s1");
        assert!(second.token.is_cancelled());
        assert!(!first.token.is_cancelled());
    }
}
