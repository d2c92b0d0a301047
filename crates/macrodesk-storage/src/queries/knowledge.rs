// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base reads. Scoring/ranking happens in the tool layer; storage
//! only filters on publication status.

use macrodesk_core::MacrodeskError;

use crate::database::Database;
use crate::models::KnowledgeArticle;

/// All published articles.
pub async fn published_articles(db: &Database) -> Result<Vec<KnowledgeArticle>, MacrodeskError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, article_id, title, content, metadata, status, created_at
                 FROM knowledge_base WHERE status = 'published' ORDER BY article_id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(KnowledgeArticle {
                    id: row.get(0)?,
                    article_id: row.get(1)?,
                    title: row.get(2)?,
                    content: row.get(3)?,
                    metadata: row.get(4)?,
                    status: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            let mut articles = Vec::new();
            for row in rows {
                articles.push(row?);
            }
            Ok(articles)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
