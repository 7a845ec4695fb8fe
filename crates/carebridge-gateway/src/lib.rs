// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/SSE gateway for CareBridge.
//!
//! Exposes the orchestrator's session and staff operations as a REST API
//! with SSE streaming for turn delivery. Authentication is a bearer shared
//! secret, fail-closed.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod sse;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, ServerConfig};
