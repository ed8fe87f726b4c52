//! Shard claim coordination
//!
//! Each worker first drains shards it already owns (left unfinished by a
//! crash or restart), then claims fresh unowned shards one at a time. The
//! owned set is checked before every fresh claim, so a shard this worker
//! owns is never abandoned in favor of a new one.

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::shard::{Shard, WorkerId};
use crate::store::ShardStore;

/// How a shard came to be handed to the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimSource {
    /// Already owned by this worker and not finished
    Resumed,
    /// Newly claimed from the unowned pool
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedShard {
    pub shard: Shard,
    pub source: ClaimSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resuming,
    Claiming,
    Drained,
}

/// Hands out the next shard a worker should process
pub struct ClaimCoordinator {
    store: Arc<dyn ShardStore>,
    worker: WorkerId,
    phase: Phase,
}

impl ClaimCoordinator {
    pub fn new(store: Arc<dyn ShardStore>, worker: WorkerId) -> Self {
        Self {
            store,
            worker,
            phase: Phase::Resuming,
        }
    }

    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    /// Next shard to process, or `None` once nothing is owned-and-unfinished
    /// and nothing unowned remains.
    pub async fn next_shard(&mut self) -> Result<Option<ClaimedShard>, StoreError> {
        if let Some(shard) = self.store.claim_unfinished_owned_by(&self.worker).await? {
            debug!(shard_id = %shard.id, progress = ?shard.progress, "Resuming owned shard");
            return Ok(Some(ClaimedShard {
                shard,
                source: ClaimSource::Resumed,
            }));
        }

        if self.phase == Phase::Resuming {
            info!(worker = %self.worker, "No owned shards left, claiming fresh shards");
            self.phase = Phase::Claiming;
        }

        match self.store.claim_fresh_unowned(&self.worker).await? {
            Some(shard) => {
                debug!(
                    shard_id = %shard.id,
                    window = %shard.window,
                    license = %shard.license,
                    "Claimed fresh shard"
                );
                Ok(Some(ClaimedShard {
                    shard,
                    source: ClaimSource::Fresh,
                }))
            }
            None => {
                if self.phase != Phase::Drained {
                    info!(worker = %self.worker, "No unowned shards left");
                    self.phase = Phase::Drained;
                }
                Ok(None)
            }
        }
    }
}
