//! Postgres-backed shard store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvest_common::types::{DateWindow, License};
use sqlx::PgPool;

use super::{ShardStore, ShardSummary};
use crate::error::{StoreError, StoreResult};
use crate::shard::{NewShard, Shard, ShardId, ShardProgress, WorkerId};

const SHARD_COLUMNS: &str = "shard_id, date_from, date_to, license, owner, status, cursor";

#[derive(Debug, sqlx::FromRow)]
struct ShardRow {
    shard_id: i64,
    date_from: DateTime<Utc>,
    date_to: DateTime<Utc>,
    license: String,
    owner: Option<String>,
    status: String,
    cursor: Option<String>,
}

impl TryFrom<ShardRow> for Shard {
    type Error = StoreError;

    fn try_from(row: ShardRow) -> Result<Self, Self::Error> {
        let window = DateWindow::new(row.date_from, row.date_to)
            .map_err(|e| StoreError::corrupt(format!("shard {}: {}", row.shard_id, e)))?;
        let license = row
            .license
            .parse::<License>()
            .map_err(|e| StoreError::corrupt(format!("shard {}: {}", row.shard_id, e)))?;
        let progress = ShardProgress::from_columns(&row.status, row.cursor)?;

        Ok(Shard {
            id: ShardId(row.shard_id),
            window,
            license,
            owner: row.owner.map(WorkerId::new),
            progress,
        })
    }
}

/// Shard store over the `harvest_shards` table
#[derive(Clone)]
pub struct PgShardStore {
    pool: PgPool,
}

impl PgShardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ShardStore for PgShardStore {
    async fn claim_unfinished_owned_by(&self, worker: &WorkerId) -> StoreResult<Option<Shard>> {
        let query = format!(
            r#"
            SELECT {SHARD_COLUMNS}
            FROM harvest_shards
            WHERE owner = $1 AND status IN ('not_started', 'in_progress')
            ORDER BY (status = 'in_progress') DESC, shard_id
            LIMIT 1
            "#
        );

        let row: Option<ShardRow> = sqlx::query_as(&query)
            .bind(worker.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Shard::try_from).transpose()
    }

    async fn claim_fresh_unowned(&self, worker: &WorkerId) -> StoreResult<Option<Shard>> {
        // One statement: pick an unowned row no other transaction holds, mark
        // it owned, and hand back exactly that row via RETURNING. The outer
        // `owner IS NULL` keeps the update conditional even if the row
        // changed hands between the subquery and the update.
        let query = format!(
            r#"
            UPDATE harvest_shards
            SET owner = $1, claimed_at = NOW(), updated_at = NOW()
            WHERE shard_id = (
                SELECT shard_id
                FROM harvest_shards
                WHERE owner IS NULL AND status = 'not_started'
                ORDER BY shard_id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND owner IS NULL
            RETURNING {SHARD_COLUMNS}
            "#
        );

        let row: Option<ShardRow> = sqlx::query_as(&query)
            .bind(worker.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Shard::try_from).transpose()
    }

    async fn persist_progress(
        &self,
        shard_id: ShardId,
        worker: &WorkerId,
        progress: &ShardProgress,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE harvest_shards
            SET status = $3, cursor = $4, updated_at = NOW()
            WHERE shard_id = $1 AND owner = $2
            "#,
        )
        .bind(shard_id.0)
        .bind(worker.as_str())
        .bind(progress.status().as_str())
        .bind(progress.cursor().map(|c| c.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OwnershipLost {
                shard_id,
                worker: worker.clone(),
            });
        }

        Ok(())
    }

    async fn insert_shards(&self, shards: &[NewShard]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0;

        for shard in shards {
            let result = sqlx::query(
                r#"
                INSERT INTO harvest_shards (date_from, date_to, license)
                VALUES ($1, $2, $3)
                ON CONFLICT (date_from, date_to, license) DO NOTHING
                "#,
            )
            .bind(shard.window.from())
            .bind(shard.window.to())
            .bind(shard.license.as_str())
            .execute(&mut *tx)
            .await?;

            created += result.rows_affected();
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn summary(&self) -> StoreResult<ShardSummary> {
        let (unclaimed, not_started, in_progress, finished): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*) FILTER (WHERE owner IS NULL),
                    COUNT(*) FILTER (WHERE owner IS NOT NULL AND status = 'not_started'),
                    COUNT(*) FILTER (WHERE status = 'in_progress'),
                    COUNT(*) FILTER (WHERE status = 'finished')
                FROM harvest_shards
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(ShardSummary {
            unclaimed,
            not_started,
            in_progress,
            finished,
        })
    }
}
