// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events delivery for streaming turns.
//!
//! Turn events map one-to-one onto SSE events named `start`, `token`,
//! `done`, `error`, and `heartbeat`, each with the serialized [`TurnEvent`]
//! as its JSON data. The client dropping the connection drops this stream,
//! which drops the orchestrator's channel receiver and cancels the
//! in-flight generation.

use axum::response::sse::{Event, Sse};
use carebridge_core::TurnEvent;
use futures::stream::Stream;
use tokio::sync::mpsc;

/// Wrap an orchestrator event channel as an SSE response.
pub fn stream_events(
    rx: mpsc::Receiver<TurnEvent>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let events = futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((to_sse_event(&event), rx))
    });
    Sse::new(events)
}

fn to_sse_event(event: &TurnEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.event_name()).json_data(event)
}
