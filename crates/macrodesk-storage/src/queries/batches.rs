// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch coordination operations.
//!
//! The batches table replaces in-memory debounce timers with per-customer
//! scheduling records, so state survives process restarts and scales across
//! worker processes. Claiming is transactional: a batch moves `open` ->
//! `processing` exactly once, and customers with a batch already in flight
//! are skipped.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{BatchRecord, BatchStatus};
use crate::queries::parse_enum;

const BATCH_COLUMNS: &str = "batch_id, customer_id, status, last_activity_at, created_at";

fn row_to_batch(row: &rusqlite::Row<'_>) -> Result<BatchRecord, rusqlite::Error> {
    Ok(BatchRecord {
        batch_id: row.get(0)?,
        customer_id: row.get(1)?,
        status: parse_enum(2, row.get(2)?)?,
        last_activity_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Finds the customer's open batch or creates one, then stamps
/// `last_activity_at` to now. Returns the (possibly new) record.
///
/// This is the debounce timer reset: every inbound message lands here.
pub async fn open_batch(db: &Database, customer_id: &str) -> Result<BatchRecord, MacrodeskError> {
    let customer_id = customer_id.to_string();
    let new_batch_id = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = {
                let mut stmt = tx.prepare(
                    "SELECT batch_id FROM batches WHERE customer_id = ?1 AND status = 'open'",
                )?;
                match stmt.query_row(params![customer_id], |row| row.get(0)) {
                    Ok(id) => Some(id),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let batch_id = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE batches
                         SET last_activity_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                         WHERE batch_id = ?1",
                        params![id],
                    )?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO batches (batch_id, customer_id, status, last_activity_at, created_at)
                         VALUES (?1, ?2, 'open',
                                 strftime('%Y-%m-%dT%H:%M:%fZ','now'),
                                 strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
                        params![new_batch_id, customer_id],
                    )?;
                    new_batch_id
                }
            };

            let record = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {BATCH_COLUMNS} FROM batches WHERE batch_id = ?1"
                ))?;
                stmt.query_row(params![batch_id], row_to_batch)?
            };
            tx.commit()?;
            Ok(record)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claims every open batch whose quiet period has elapsed,
/// flipping it to `processing`.
///
/// A customer with a batch already `processing` is skipped; their open batch
/// stays queued until the in-flight one completes or fails.
pub async fn claim_due_batches(
    db: &Database,
    window_seconds: u64,
) -> Result<Vec<BatchRecord>, MacrodeskError> {
    let cutoff_modifier = format!("-{window_seconds} seconds");
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let due: Vec<BatchRecord> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {BATCH_COLUMNS} FROM batches
                     WHERE status = 'open'
                       AND last_activity_at <= strftime('%Y-%m-%dT%H:%M:%fZ','now', ?1)
                       AND customer_id NOT IN
                           (SELECT customer_id FROM batches WHERE status = 'processing')
                     ORDER BY last_activity_at ASC"
                ))?;
                let rows = stmt.query_map(params![cutoff_modifier], row_to_batch)?;
                let mut batches = Vec::new();
                for row in rows {
                    batches.push(row?);
                }
                batches
            };

            for batch in &due {
                tx.execute(
                    "UPDATE batches SET status = 'processing' WHERE batch_id = ?1",
                    params![batch.batch_id],
                )?;
            }
            tx.commit()?;

            Ok(due
                .into_iter()
                .map(|b| BatchRecord {
                    status: BatchStatus::Processing,
                    ..b
                })
                .collect())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Marks a batch with a terminal status. Rows are retained for operator
/// visibility; subsequent inbound messages open a fresh batch.
pub async fn set_status(
    db: &Database,
    batch_id: &str,
    status: BatchStatus,
) -> Result<(), MacrodeskError> {
    let batch_id = batch_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE batches SET status = ?1 WHERE batch_id = ?2",
                params![status, batch_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a batch by id.
pub async fn get_batch(db: &Database, batch_id: &str) -> Result<Option<BatchRecord>, MacrodeskError> {
    let batch_id = batch_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {BATCH_COLUMNS} FROM batches WHERE batch_id = ?1"
            ))?;
            match stmt.query_row(params![batch_id], row_to_batch) {
                Ok(batch) => Ok(Some(batch)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
