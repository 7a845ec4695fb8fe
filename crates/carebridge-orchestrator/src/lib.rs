// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session orchestration for CareBridge.
//!
//! The [`Orchestrator`] runs the per-turn pipeline over the conversation
//! store, the inference engine, and the safety filter: pre-filter
//! classification, short-circuit policy responses, generation (streamed or
//! whole), post-filter validation, persistence, delivery. The
//! [`GenerationRegistry`] holds per-session cancellation handles for
//! in-flight streaming turns.

pub mod registry;
pub mod staff;
pub mod stream;
pub mod turn;

pub use registry::GenerationRegistry;
pub use turn::Orchestrator;
