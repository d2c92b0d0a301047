// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Demo dataset for local runs and integration tests: a small PC-parts
//! catalog, a handful of orders, and the knowledge base.
//!
//! Inserts use `INSERT OR IGNORE` so seeding is idempotent.

use macrodesk_core::MacrodeskError;
use rusqlite::params;

use crate::database::Database;

struct ProductRow(&'static str, &'static str, &'static str, i64, &'static str);
struct InventoryRow(&'static str, i64, i64);
struct ArticleRow(
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
);

const PRODUCTS: &[ProductRow] = &[
    ProductRow("p-4090", "GPU-RTX4090", "GeForce RTX 4090 24GB", 189_999, "gpu"),
    ProductRow("p-4070ti", "GPU-RTX4070TI", "GeForce RTX 4070 Ti 12GB", 79_999, "gpu"),
    ProductRow("p-14900k", "CPU-I9-14900K", "Intel Core i9-14900K", 58_999, "cpu"),
    ProductRow("p-z790", "MB-Z790-PRO", "Z790 Pro ATX Motherboard", 32_999, "motherboard"),
    ProductRow("p-ddr5", "RAM-DDR5-32", "DDR5-6000 32GB Kit", 12_999, "memory"),
    ProductRow("p-psu", "PSU-1000W", "1000W 80+ Gold PSU", 17_999, "psu"),
    ProductRow("p-ssd", "SSD-2TB-NVME", "2TB NVMe Gen4 SSD", 14_999, "storage"),
    ProductRow("p-case", "CASE-ATX-MID", "ATX Mid Tower Case", 8_999, "case"),
];

// (product_id, quantity, low_stock_threshold)
const INVENTORY: &[InventoryRow] = &[
    InventoryRow("p-4090", 3, 5),
    InventoryRow("p-4070ti", 14, 5),
    InventoryRow("p-14900k", 22, 5),
    InventoryRow("p-z790", 8, 5),
    InventoryRow("p-ddr5", 40, 10),
    InventoryRow("p-psu", 11, 5),
    InventoryRow("p-ssd", 35, 10),
    InventoryRow("p-case", 0, 5),
];

// (article_id, title, category, tags JSON, content)
const ARTICLES: &[ArticleRow] = &[
    ArticleRow(
        "KB-1001",
        "Return Policy",
        "returns",
        r#"["returns","refund","rma"]"#,
        "Most items can be returned within 30 days of delivery for a full refund. \
         Items must be in original packaging. Opened GPUs and CPUs are subject to a \
         15% restocking fee unless defective. Start a return from your order page \
         and print the prepaid label we email you.",
    ),
    ArticleRow(
        "KB-1002",
        "Shipping Times and Carriers",
        "shipping",
        r#"["shipping","delivery","tracking"]"#,
        "Standard shipping takes 3-5 business days via UPS or USPS. Expedited \
         shipping (1-2 business days) is available at checkout. Tracking numbers \
         are emailed as soon as the carrier scans the package.",
    ),
    ArticleRow(
        "KB-1003",
        "PSU Requirements for High-End GPUs",
        "compatibility",
        r#"["psu","gpu","power"]"#,
        "The RTX 4090 requires an 850W or larger power supply; the RTX 4070 Ti \
         requires 700W or larger. We recommend 80+ Gold rated units with a native \
         16-pin (12VHPWR) connector for 40-series cards.",
    ),
    ArticleRow(
        "KB-1004",
        "Dead on Arrival (DOA) Parts",
        "returns",
        r#"["doa","returns","replacement"]"#,
        "Parts that arrive non-functional qualify for expedited replacement. \
         Report DOA hardware within 14 days and we ship a replacement with an \
         expedited return label before the defective unit arrives back.",
    ),
    ArticleRow(
        "KB-1005",
        "Accepted Payment Methods",
        "payments",
        r#"["payments","billing"]"#,
        "We accept major credit cards, PayPal, and financing through our partner. \
         Refunds are returned to the original payment method in 3-5 business days.",
    ),
];

/// Seed the demo catalog, orders, and knowledge base.
pub async fn seed_demo_data(db: &Database) -> Result<(), MacrodeskError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;

            for ProductRow(id, sku, name, price_cents, category) in PRODUCTS {
                tx.execute(
                    "INSERT OR IGNORE INTO products (id, sku, name, description, price_cents, category)
                     VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
                    params![id, sku, name, price_cents, category],
                )?;
            }

            for InventoryRow(product_id, quantity, threshold) in INVENTORY {
                tx.execute(
                    "INSERT OR IGNORE INTO inventory (id, product_id, quantity, warehouse, low_stock_threshold)
                     VALUES ('inv-' || ?1, ?1, ?2, 'main', ?3)",
                    params![product_id, quantity, threshold],
                )?;
            }

            // Orders. ORD-1001 is the canonical demo order: delivered, under the
            // refund approval limit. ORD-1004 is over the limit.
            let orders: &[(&str, &str, &str, i64, Option<&str>, Option<&str>)] = &[
                ("o-1001", "ORD-1001", "delivered", 32_999, Some("1Z999AA10123456784"), Some("UPS")),
                ("o-1002", "ORD-1002", "shipped", 189_999, Some("9400111899223197428490"), Some("USPS")),
                ("o-1003", "ORD-1003", "pending", 25_998, None, None),
                ("o-1004", "ORD-1004", "processing", 92_998, None, None),
            ];
            for (id, number, status, total_cents, tracking, carrier) in orders {
                tx.execute(
                    "INSERT OR IGNORE INTO orders
                        (id, order_number, customer_id, status, total_cents, shipping_address,
                         tracking_number, carrier, customer_name, customer_email, notes)
                     VALUES (?1, ?2, NULL, ?3, ?4,
                             '{\"street\":\"123 Congress Ave\",\"city\":\"Austin\",\"state\":\"TX\",\"zip\":\"78701\"}',
                             ?5, ?6, 'Kal Moore', 'kal@example.com', NULL)",
                    params![id, number, status, total_cents, tracking, carrier],
                )?;
            }

            let items: &[(&str, &str, &str, &str, i64, i64)] = &[
                ("oi-1", "o-1001", "MB-Z790-PRO", "Z790 Pro ATX Motherboard", 1, 32_999),
                ("oi-2", "o-1002", "GPU-RTX4090", "GeForce RTX 4090 24GB", 1, 189_999),
                ("oi-3", "o-1003", "RAM-DDR5-32", "DDR5-6000 32GB Kit", 2, 12_999),
                ("oi-4", "o-1004", "GPU-RTX4070TI", "GeForce RTX 4070 Ti 12GB", 1, 79_999),
                ("oi-5", "o-1004", "RAM-DDR5-32", "DDR5-6000 32GB Kit", 1, 12_999),
            ];
            for (id, order_id, sku, name, quantity, unit_price) in items {
                tx.execute(
                    "INSERT OR IGNORE INTO order_items
                        (id, order_id, sku, product_name, quantity, unit_price_cents)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![id, order_id, sku, name, quantity, unit_price],
                )?;
            }

            for ArticleRow(article_id, title, category, tags, content) in ARTICLES {
                let metadata = format!(r#"{{"category":"{category}","tags":{tags}}}"#);
                tx.execute(
                    "INSERT OR IGNORE INTO knowledge_base (id, article_id, title, content, metadata, status)
                     VALUES ('kb-' || ?1, ?1, ?2, ?3, ?4, 'published')",
                    params![article_id, title, content, metadata],
                )?;
            }

            // One unpublished draft, to exercise status filtering.
            tx.execute(
                "INSERT OR IGNORE INTO knowledge_base (id, article_id, title, content, metadata, status)
                 VALUES ('kb-KB-1099', 'KB-1099', 'Unreleased Pricing FAQ', 'draft content',
                         '{\"category\":\"payments\",\"tags\":[]}', 'draft')",
                [],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("seed.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        seed_demo_data(&db).await.unwrap();
        seed_demo_data(&db).await.unwrap();

        let (products, orders): (i64, i64) = db
            .connection()
            .call(|conn| {
                let p = conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?;
                let o = conn.query_row("SELECT COUNT(*) FROM orders", [], |r| r.get(0))?;
                Ok((p, o))
            })
            .await
            .unwrap();
        assert_eq!(products, 8);
        assert_eq!(orders, 4);

        db.close().await.unwrap();
    }
}
