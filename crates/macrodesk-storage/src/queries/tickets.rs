// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket operations. The core only creates tickets and reads them back;
//! state transitions belong to the human workflow.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::Ticket;
use crate::queries::parse_enum;

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    Ok(Ticket {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        status: parse_enum(2, row.get(2)?)?,
        issue_type: row.get(3)?,
        severity: row.get(4)?,
        notes: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a new ticket.
pub async fn create_ticket(db: &Database, ticket: &Ticket) -> Result<(), MacrodeskError> {
    let ticket = ticket.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tickets (id, customer_id, status, issue_type, severity, notes,
                                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    ticket.id,
                    ticket.customer_id,
                    ticket.status.to_string(),
                    ticket.issue_type,
                    ticket.severity,
                    ticket.notes,
                    ticket.created_at,
                    ticket.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All tickets for a customer, newest first.
pub async fn tickets_for_customer(
    db: &Database,
    customer_id: &str,
) -> Result<Vec<Ticket>, MacrodeskError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, customer_id, status, issue_type, severity, notes,
                        created_at, updated_at
                 FROM tickets WHERE customer_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt.query_map(params![customer_id], row_to_ticket)?;
            let mut tickets = Vec::new();
            for row in rows {
                tickets.push(row?);
            }
            Ok(tickets)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
