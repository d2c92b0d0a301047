// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `macrodesk seed` command implementation.

use macrodesk_config::MacrodeskConfig;
use macrodesk_core::MacrodeskError;
use macrodesk_storage::{Database, fixtures};

/// Loads the demo dataset into the configured database. Idempotent.
pub async fn run_seed(config: &MacrodeskConfig) -> Result<(), MacrodeskError> {
    let db = Database::open_with_options(&config.storage.database_path, config.storage.wal_mode)
        .await?;
    fixtures::seed_demo_data(&db).await?;
    db.close().await?;
    println!(
        "seeded demo catalog, orders, and knowledge base into {}",
        config.storage.database_path
    );
    Ok(())
}
