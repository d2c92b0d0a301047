// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Customer CRUD and channel-linking operations.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Customer, CustomerUpdate};
use crate::queries::parse_json_map;

const CUSTOMER_COLUMNS: &str = "id, phone_number, email, first_name, last_name, company_name, \
                                account_tier, extracted_data, created_at, updated_at";

fn row_to_customer(row: &rusqlite::Row<'_>) -> Result<Customer, rusqlite::Error> {
    Ok(Customer {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        company_name: row.get(5)?,
        account_tier: row.get(6)?,
        extracted_data: parse_json_map(7, row.get(7)?)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert a new customer.
pub async fn create_customer(db: &Database, customer: &Customer) -> Result<(), MacrodeskError> {
    let customer = customer.clone();
    db.connection()
        .call(move |conn| {
            let extracted = serde_json::Value::Object(customer.extracted_data.clone()).to_string();
            conn.execute(
                "INSERT INTO customers (id, phone_number, email, first_name, last_name,
                                        company_name, account_tier, extracted_data,
                                        created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    customer.id,
                    customer.phone_number,
                    customer.email,
                    customer.first_name,
                    customer.last_name,
                    customer.company_name,
                    customer.account_tier,
                    extracted,
                    customer.created_at,
                    customer.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a customer by id.
pub async fn get_customer(db: &Database, id: &str) -> Result<Option<Customer>, MacrodeskError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_customer) {
                Ok(customer) => Ok(Some(customer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a customer by phone number.
pub async fn find_by_phone(db: &Database, phone: &str) -> Result<Option<Customer>, MacrodeskError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone_number = ?1"
            ))?;
            match stmt.query_row(params![phone], row_to_customer) {
                Ok(customer) => Ok(Some(customer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find a customer by email.
pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<Customer>, MacrodeskError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = ?1"
            ))?;
            match stmt.query_row(params![email], row_to_customer) {
                Ok(customer) => Ok(Some(customer)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List customers, newest first.
pub async fn list_customers(db: &Database, limit: i64) -> Result<Vec<Customer>, MacrodeskError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_customer)?;
            let mut customers = Vec::new();
            for row in rows {
                customers.push(row?);
            }
            Ok(customers)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Backfill a missing phone number (channel linking).
pub async fn set_phone(db: &Database, id: &str, phone: &str) -> Result<(), MacrodeskError> {
    let id = id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE customers SET phone_number = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?2",
                params![phone, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Backfill a missing email (channel linking).
pub async fn set_email(db: &Database, id: &str, email: &str) -> Result<(), MacrodeskError> {
    let id = id.to_string();
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE customers SET email = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?2",
                params![email, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a profile update in one transaction: column fields overwrite when
/// present, `extracted` merges into `extracted_data` last-write-wins per key.
///
/// Returns the updated customer.
pub async fn update_profile(
    db: &Database,
    id: &str,
    update: &CustomerUpdate,
) -> Result<Customer, MacrodeskError> {
    let id = id.to_string();
    let update = update.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let mut customer = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
                ))?;
                stmt.query_row(params![id], row_to_customer)?
            };

            if let Some(v) = update.first_name {
                customer.first_name = Some(v);
            }
            if let Some(v) = update.last_name {
                customer.last_name = Some(v);
            }
            if let Some(v) = update.company_name {
                customer.company_name = Some(v);
            }
            if let Some(v) = update.account_tier {
                customer.account_tier = Some(v);
            }
            if let Some(v) = update.email {
                customer.email = Some(v);
            }
            if let Some(v) = update.phone_number {
                customer.phone_number = Some(v);
            }
            for (key, value) in update.extracted {
                customer.extracted_data.insert(key, value);
            }

            let extracted = serde_json::Value::Object(customer.extracted_data.clone()).to_string();
            tx.execute(
                "UPDATE customers SET phone_number = ?1, email = ?2, first_name = ?3,
                        last_name = ?4, company_name = ?5, account_tier = ?6,
                        extracted_data = ?7,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?8",
                params![
                    customer.phone_number,
                    customer.email,
                    customer.first_name,
                    customer.last_name,
                    customer.company_name,
                    customer.account_tier,
                    extracted,
                    customer.id,
                ],
            )?;
            tx.commit()?;
            Ok(customer)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
