// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stateless safety filter for the CareBridge conversation broker.
//!
//! Pure functions classifying a message (and later, a generated response)
//! against keyword/pattern rule tables. No state.

pub mod filter;
pub mod rules;

pub use filter::{
    classify_incoming, classify_prohibited, validate_generated, GeneratedVerdict,
    IncomingClassification, ProhibitedClassification,
};
