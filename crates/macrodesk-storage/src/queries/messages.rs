// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD operations. Messages are immutable once created; ordering by
//! creation time is the conversation's source of truth across channels.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Message;
use crate::queries::parse_enum;

const MESSAGE_COLUMNS: &str =
    "id, customer_id, direction, channel, content, batch_id, metadata, created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        direction: parse_enum(2, row.get(2)?)?,
        channel: parse_enum(3, row.get(3)?)?,
        content: row.get(4)?,
        batch_id: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Insert a new message.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), MacrodeskError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, customer_id, direction, channel, content,
                                       batch_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    message.customer_id,
                    message.direction.to_string(),
                    message.channel.to_string(),
                    message.content,
                    message.batch_id,
                    message.metadata,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All messages for a customer, oldest first.
///
/// When `limit` is set, the most recent N messages are kept (still returned
/// oldest first) so a bounded prompt keeps the tail of the conversation.
pub async fn messages_for_customer(
    db: &Database,
    customer_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, MacrodeskError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE customer_id = ?1
                         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
                    ))?;
                    let rows = stmt.query_map(params![customer_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                    messages.reverse();
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE customer_id = ?1
                         ORDER BY created_at ASC, rowid ASC"
                    ))?;
                    let rows = stmt.query_map(params![customer_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Inbound messages stamped with the given batch id, oldest first.
pub async fn messages_for_batch(
    db: &Database,
    batch_id: &str,
) -> Result<Vec<Message>, MacrodeskError> {
    let batch_id = batch_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE batch_id = ?1 AND direction = 'inbound'
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![batch_id], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
