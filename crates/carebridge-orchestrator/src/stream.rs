// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming turn delivery.
//!
//! The streaming variant runs the same pipeline as `send_message` but
//! delivers the turn as an ordered [`TurnEvent`] sequence over an mpsc
//! channel: `Start`, zero or more `Token`s, then exactly one `Done` or
//! `Error`. A cancelled turn emits no terminal event and persists no
//! assistant message. Heartbeats tick on a fixed interval while generation
//! is in flight so idle-timeout intermediaries keep the connection open.

use carebridge_core::{CareError, TurnEvent};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::registry::Generation;
use crate::turn::{Orchestrator, PreFilter};

/// Channel capacity for turn events. Token fragments are small; a slow
/// consumer applies backpressure to the engine stream rather than buffering
/// unboundedly.
const EVENT_CHANNEL_CAPACITY: usize = 32;

impl Orchestrator {
    /// Streaming patient turn.
    ///
    /// Gating errors (unknown session, closed, staff-owned, limits, bad
    /// input) surface as `Err` before any event is emitted. After that the
    /// turn runs in a spawned task and all outcomes arrive as events; the
    /// receiver being dropped mid-stream counts as a client disconnect and
    /// cancels the generation.
    pub async fn send_message_stream(
        self: std::sync::Arc<Self>,
        session_id: &str,
        text: &str,
    ) -> Result<mpsc::Receiver<TurnEvent>, CareError> {
        let conversation = self.gate_patient_turn(session_id, text).await?;
        let pre_filter = self.persist_user_turn(&conversation.id, text).await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let orchestrator = self;
        let session_id = conversation.id;
        tokio::spawn(async move {
            orchestrator.run_stream_turn(session_id, pre_filter, tx).await;
        });

        Ok(rx)
    }

    async fn run_stream_turn(
        &self,
        session_id: String,
        pre_filter: PreFilter,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        if tx
            .send(TurnEvent::Start {
                conversation_id: session_id.clone(),
            })
            .await
            .is_err()
        {
            return;
        }

        match pre_filter {
            PreFilter::Emergency { matched } => {
                let result = self.short_circuit_emergency(&session_id, &matched).await;
                Self::deliver_short_circuit(&tx, result).await;
            }
            PreFilter::Prohibited => {
                let result = self.short_circuit_refusal(&session_id).await;
                Self::deliver_short_circuit(&tx, result).await;
            }
            PreFilter::Pass { urgent } => {
                self.stream_generation(&session_id, urgent, tx).await;
            }
        }
    }

    /// A short-circuit turn streams its canned text as a single token event
    /// followed by the same terminal payload the non-streaming path returns.
    async fn deliver_short_circuit(
        tx: &mpsc::Sender<TurnEvent>,
        result: Result<carebridge_core::Message, CareError>,
    ) {
        match result {
            Ok(message) => {
                let _ = tx
                    .send(TurnEvent::Token {
                        delta: message.content.clone(),
                        text: message.content.clone(),
                    })
                    .await;
                let _ = tx.send(TurnEvent::Done { message }).await;
            }
            Err(e) => {
                let _ = tx
                    .send(TurnEvent::Error {
                        code: e.error_code().to_string(),
                        message: e.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn stream_generation(
        &self,
        session_id: &str,
        urgent: bool,
        tx: mpsc::Sender<TurnEvent>,
    ) {
        let generation = self.registry.begin(session_id);
        let outcome = self
            .drive_generation(session_id, urgent, &generation, &tx)
            .await;
        self.registry.finish(session_id, &generation);

        if let Err(e) = outcome {
            match e {
                CareError::Cancelled => {
                    // No terminal event for a cancelled turn.
                    info!(session_id = %session_id, "generation cancelled");
                }
                e => {
                    let _ = tx
                        .send(TurnEvent::Error {
                            code: e.error_code().to_string(),
                            message: e.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    /// Relays engine fragments as token events until the terminal chunk,
    /// then post-filters, persists, and emits `Done`. Returns
    /// `Err(Cancelled)` when the cancellation token fires or the receiver
    /// goes away; no assistant message is persisted in that case.
    async fn drive_generation(
        &self,
        session_id: &str,
        urgent: bool,
        generation: &Generation,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> Result<(), CareError> {
        let context = self.store.get_context_window(session_id).await?;

        let mut cumulative = String::new();
        if urgent {
            // The advisory leads the stream before generation begins and is
            // part of the persisted final text.
            let prefix = self.advisory_prefix();
            cumulative.push_str(&prefix);
            if tx
                .send(TurnEvent::Token {
                    delta: prefix,
                    text: cumulative.clone(),
                })
                .await
                .is_err()
            {
                return Err(CareError::Cancelled);
            }
        }

        let mut heartbeat = tokio::time::interval_at(
            tokio::time::Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Engine invocation happens inside the select loop's lifetime;
        // dropping the stream on cancel drops the underlying request.
        let mut stream = self.engine.stream(&context).await?;
        let mut generated = String::new();
        let mut token_count = 0u32;
        let started = std::time::Instant::now();

        loop {
            tokio::select! {
                _ = generation.token.cancelled() => {
                    return Err(CareError::Cancelled);
                }
                _ = heartbeat.tick() => {
                    if tx.send(TurnEvent::Heartbeat).await.is_err() {
                        generation.token.cancel();
                        return Err(CareError::Cancelled);
                    }
                }
                chunk = stream.next() => {
                    match chunk {
                        Some(Ok(chunk)) => {
                            if !chunk.delta.is_empty() {
                                generated.push_str(&chunk.delta);
                                cumulative.push_str(&chunk.delta);
                                if tx
                                    .send(TurnEvent::Token {
                                        delta: chunk.delta,
                                        text: cumulative.clone(),
                                    })
                                    .await
                                    .is_err()
                                {
                                    generation.token.cancel();
                                    return Err(CareError::Cancelled);
                                }
                            }
                            if chunk.stop {
                                token_count = chunk.token_count.unwrap_or(token_count);
                                break;
                            }
                        }
                        Some(Err(e)) => return Err(e),
                        None => break,
                    }
                }
            }
        }
        drop(stream);

        if generated.trim().is_empty() {
            return Err(CareError::EngineError {
                message: "engine streamed an empty completion".into(),
                source: None,
            });
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let (final_text, metadata) = self.post_filter(&generated, urgent, token_count, latency_ms);
        debug!(
            session_id = %session_id,
            tokens = token_count,
            latency_ms,
            "streamed generation complete"
        );

        let message = self
            .store
            .add_message(session_id, carebridge_core::Role::Assistant, &final_text, Some(metadata))
            .await?;
        let _ = tx.send(TurnEvent::Done { message }).await;
        Ok(())
    }
}
