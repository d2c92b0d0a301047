// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order read and mutation operations. Only refunds and status changes
//! mutate; everything else is reference data.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Order, OrderItem, OrderStatus};
use crate::queries::parse_enum;

const ORDER_COLUMNS: &str = "id, order_number, customer_id, status, total_cents, \
                             shipping_address, tracking_number, carrier, customer_name, \
                             customer_email, notes, created_at, updated_at";

fn row_to_order(row: &rusqlite::Row<'_>) -> Result<Order, rusqlite::Error> {
    Ok(Order {
        id: row.get(0)?,
        order_number: row.get(1)?,
        customer_id: row.get(2)?,
        status: parse_enum(3, row.get(3)?)?,
        total_cents: row.get(4)?,
        shipping_address: row.get(5)?,
        tracking_number: row.get(6)?,
        carrier: row.get(7)?,
        customer_name: row.get(8)?,
        customer_email: row.get(9)?,
        notes: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<OrderItem, rusqlite::Error> {
    Ok(OrderItem {
        id: row.get(0)?,
        order_id: row.get(1)?,
        sku: row.get(2)?,
        product_name: row.get(3)?,
        quantity: row.get(4)?,
        unit_price_cents: row.get(5)?,
    })
}

fn select_order(
    conn: &rusqlite::Connection,
    order_number: &str,
) -> Result<Option<Order>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"
    ))?;
    match stmt.query_row(params![order_number], row_to_order) {
        Ok(order) => Ok(Some(order)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Find an order and its line items by order number.
pub async fn find_order(
    db: &Database,
    order_number: &str,
) -> Result<Option<(Order, Vec<OrderItem>)>, MacrodeskError> {
    let order_number = order_number.to_string();
    db.connection()
        .call(move |conn| {
            let Some(order) = select_order(conn, &order_number)? else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT id, order_id, sku, product_name, quantity, unit_price_cents
                 FROM order_items WHERE order_id = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![order.id], row_to_item)?;
            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Some((order, items)))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Marks the order refunded and reduces its total by `amount_cents`, in one
/// transaction. Returns the updated order.
pub async fn apply_refund(
    db: &Database,
    order_number: &str,
    amount_cents: i64,
) -> Result<Order, MacrodeskError> {
    let order_number = order_number.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let order = select_order(&tx, &order_number)?.ok_or_else(|| {
                rusqlite::Error::QueryReturnedNoRows
            })?;

            let new_total = order.total_cents - amount_cents;
            tx.execute(
                "UPDATE orders SET status = 'refunded', total_cents = ?1,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE order_number = ?2",
                params![new_total, order_number],
            )?;

            let updated = select_order(&tx, &order_number)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sets the order status, and tracking/carrier when provided. Returns the
/// updated order. Transition validity is enforced by the calling tool.
pub async fn set_order_status(
    db: &Database,
    order_number: &str,
    status: OrderStatus,
    tracking_number: Option<&str>,
    carrier: Option<&str>,
) -> Result<Order, MacrodeskError> {
    let order_number = order_number.to_string();
    let status = status.to_string();
    let tracking_number = tracking_number.map(str::to_string);
    let carrier = carrier.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE orders SET status = ?1,
                        tracking_number = COALESCE(?2, tracking_number),
                        carrier = COALESCE(?3, carrier),
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE order_number = ?4",
                params![status, tracking_number, carrier, order_number],
            )?;
            let updated = select_order(&tx, &order_number)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seed_demo_data;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn find_order_returns_order_with_items() {
        let (db, _dir) = setup_db().await;

        let (order, items) = find_order(&db, "ORD-1001").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.order_id == order.id));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_order_unknown_number_is_none() {
        let (db, _dir) = setup_db().await;
        assert!(find_order(&db, "ORD-9999").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn apply_refund_mutates_status_and_total() {
        let (db, _dir) = setup_db().await;

        let (before, _) = find_order(&db, "ORD-1001").await.unwrap().unwrap();
        let refunded = apply_refund(&db, "ORD-1001", 10_000).await.unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(refunded.total_cents, before.total_cents - 10_000);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_status_updates_tracking_when_provided() {
        let (db, _dir) = setup_db().await;

        let updated = set_order_status(
            &db,
            "ORD-1003",
            OrderStatus::Shipped,
            Some("1Z999AA10123456784"),
            Some("UPS"),
        )
        .await
        .unwrap();
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert_eq!(updated.tracking_number.as_deref(), Some("1Z999AA10123456784"));
        assert_eq!(updated.carrier.as_deref(), Some("UPS"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_status_preserves_existing_tracking_when_absent() {
        let (db, _dir) = setup_db().await;

        let (before, _) = find_order(&db, "ORD-1002").await.unwrap().unwrap();
        assert!(before.tracking_number.is_some());

        let updated = set_order_status(&db, "ORD-1002", OrderStatus::Delivered, None, None)
            .await
            .unwrap();
        assert_eq!(updated.tracking_number, before.tracking_number);

        db.close().await.unwrap();
    }
}
