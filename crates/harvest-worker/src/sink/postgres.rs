//! Postgres-backed record sink

use async_trait::async_trait;
use sqlx::PgPool;

use super::{IngestSink, InsertOutcome};
use crate::error::StoreResult;
use crate::record::CatalogRecord;

/// Writes records into `catalog_records`, absorbing permalink conflicts
#[derive(Clone)]
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IngestSink for PgRecordSink {
    async fn insert(&self, record: &CatalogRecord) -> StoreResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO catalog_records (
                permalink_url, download_url, license, title, description,
                created_at, genre, track_type, username, label_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (permalink_url) DO NOTHING
            "#,
        )
        .bind(&record.permalink_url)
        .bind(record.download_url.as_deref())
        .bind(&record.license)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.created_at)
        .bind(&record.genre)
        .bind(&record.track_type)
        .bind(&record.username)
        .bind(&record.label_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
