// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed persistence for CareBridge.
//!
//! A single background writer owns the connection; all access goes through
//! async query functions and the [`ConversationStore`] facade. Timestamps
//! are RFC 3339 UTC strings with millisecond precision, generated in Rust
//! so lexicographic order matches chronological order.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;

pub use database::{now_ts, Database};
pub use store::ConversationStore;
