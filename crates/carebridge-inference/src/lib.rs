// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapter for the text-completion inference engine.
//!
//! Exposes [`HttpEngine`], the production implementation of
//! `carebridge_core::InferenceEngine`. The endpoint speaks a llama.cpp-style
//! protocol: `POST /completion` with a rendered prompt, returning either a
//! single JSON body or an SSE stream of incremental fragments.

pub mod client;
pub mod prompt;
pub mod sse;
pub mod types;

pub use client::HttpEngine;
