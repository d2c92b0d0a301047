// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs through the single
//! background writer thread.

pub mod batches;
pub mod catalog;
pub mod customers;
pub mod knowledge;
pub mod messages;
pub mod orders;
pub mod tickets;

use std::str::FromStr;

/// Parses a TEXT column into one of the core enums inside a row-mapping
/// closure, converting parse failures into a rusqlite error so they surface
/// through the normal query error path.
pub(crate) fn parse_enum<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parses an `extracted_data` JSON column into a map, with the same error
/// conversion discipline as [`parse_enum`].
pub(crate) fn parse_json_map(
    idx: usize,
    raw: String,
) -> Result<serde_json::Map<String, serde_json::Value>, rusqlite::Error> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
