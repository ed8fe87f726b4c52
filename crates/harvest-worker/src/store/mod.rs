//! Durable shard table
//!
//! The store is the only source of truth for claim state. Every mutation of
//! a shard's owner or progress is a single atomic store operation: either a
//! conditional update that claims an unowned row, or an update scoped to a
//! row the caller already owns.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreResult;
use crate::shard::{NewShard, Shard, ShardId, ShardProgress, WorkerId};

pub use memory::MemoryShardStore;
pub use postgres::PgShardStore;

/// Counts of shards by claim state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShardSummary {
    /// No owner yet
    pub unclaimed: i64,
    /// Owned, first page not yet persisted
    pub not_started: i64,
    pub in_progress: i64,
    pub finished: i64,
}

impl ShardSummary {
    pub fn total(&self) -> i64 {
        self.unclaimed + self.not_started + self.in_progress + self.finished
    }

    /// Shards some worker still has to visit.
    pub fn remaining(&self) -> i64 {
        self.unclaimed + self.not_started + self.in_progress
    }
}

#[async_trait]
pub trait ShardStore: Send + Sync {
    /// Return one unfinished shard already owned by `worker`, preferring one
    /// that is mid-pagination. Used to resume after a crash or restart.
    async fn claim_unfinished_owned_by(&self, worker: &WorkerId) -> StoreResult<Option<Shard>>;

    /// Atomically transition exactly one unowned shard to owned-by-`worker`
    /// and return that row. Concurrent callers never receive the same shard.
    async fn claim_fresh_unowned(&self, worker: &WorkerId) -> StoreResult<Option<Shard>>;

    /// Durably record pagination progress of a shard owned by `worker`.
    ///
    /// Fails with [`crate::error::StoreError::OwnershipLost`] when the row is
    /// not owned by `worker`.
    async fn persist_progress(
        &self,
        shard_id: ShardId,
        worker: &WorkerId,
        progress: &ShardProgress,
    ) -> StoreResult<()>;

    /// Insert shard descriptors, skipping any whose `(window, license)`
    /// already exists. Returns the number of shards created.
    async fn insert_shards(&self, shards: &[NewShard]) -> StoreResult<u64>;

    async fn summary(&self) -> StoreResult<ShardSummary>;
}
