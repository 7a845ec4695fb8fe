// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and goes through the single
//! background writer via `connection().call()`.

pub mod conversations;
pub mod handoffs;
pub mod messages;

/// Parse a TEXT column into one of the domain enums, surfacing failures as
/// rusqlite conversion errors so they compose with `?` inside `call` closures.
pub(crate) fn parse_text_enum<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
