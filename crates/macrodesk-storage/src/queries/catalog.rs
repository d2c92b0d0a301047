// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product and inventory lookups. Read-only: stock is never decremented here.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{Inventory, Product};

fn row_to_product(row: &rusqlite::Row<'_>) -> Result<Product, rusqlite::Error> {
    Ok(Product {
        id: row.get(0)?,
        sku: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price_cents: row.get(4)?,
        category: row.get(5)?,
    })
}

/// Find a product by exact SKU.
pub async fn find_product_by_sku(
    db: &Database,
    sku: &str,
) -> Result<Option<Product>, MacrodeskError> {
    let sku = sku.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sku, name, description, price_cents, category
                 FROM products WHERE sku = ?1",
            )?;
            match stmt.query_row(params![sku], row_to_product) {
                Ok(product) => Ok(Some(product)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Case-insensitive substring search on product name.
pub async fn search_products(db: &Database, name: &str) -> Result<Vec<Product>, MacrodeskError> {
    let pattern = format!("%{}%", name.to_lowercase());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sku, name, description, price_cents, category
                 FROM products WHERE lower(name) LIKE ?1 ORDER BY sku ASC",
            )?;
            let rows = stmt.query_map(params![pattern], row_to_product)?;
            let mut products = Vec::new();
            for row in rows {
                products.push(row?);
            }
            Ok(products)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Inventory row for a product, if one exists.
pub async fn inventory_for_product(
    db: &Database,
    product_id: &str,
) -> Result<Option<Inventory>, MacrodeskError> {
    let product_id = product_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, product_id, quantity, warehouse, low_stock_threshold
                 FROM inventory WHERE product_id = ?1",
            )?;
            let result = stmt.query_row(params![product_id], |row| {
                Ok(Inventory {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    quantity: row.get(2)?,
                    warehouse: row.get(3)?,
                    low_stock_threshold: row.get(4)?,
                })
            });
            match result {
                Ok(inv) => Ok(Some(inv)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seed_demo_data;
    use macrodesk_core::types::StockStatus;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn find_by_sku_exact_match() {
        let (db, _dir) = setup_db().await;
        let product = find_product_by_sku(&db, "GPU-RTX4090").await.unwrap().unwrap();
        assert!(product.name.contains("RTX 4090"));
        assert!(find_product_by_sku(&db, "NOPE-123").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn name_search_is_case_insensitive() {
        let (db, _dir) = setup_db().await;
        let hits = search_products(&db, "rtx").await.unwrap();
        assert!(hits.len() >= 2, "expected both RTX cards, got {hits:?}");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn inventory_stock_status_derivation() {
        let (db, _dir) = setup_db().await;

        let gpu = find_product_by_sku(&db, "GPU-RTX4090").await.unwrap().unwrap();
        let inv = inventory_for_product(&db, &gpu.id).await.unwrap().unwrap();
        assert_eq!(inv.stock_status(), StockStatus::LowStock);

        let case = find_product_by_sku(&db, "CASE-ATX-MID").await.unwrap().unwrap();
        let inv = inventory_for_product(&db, &case.id).await.unwrap().unwrap();
        assert_eq!(inv.stock_status(), StockStatus::OutOfStock);

        db.close().await.unwrap();
    }
}
