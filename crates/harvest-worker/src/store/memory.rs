//! In-process shard store for tests and local dry runs

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{ShardStore, ShardSummary};
use crate::error::{StoreError, StoreResult};
use crate::shard::{NewShard, Shard, ShardId, ShardProgress, WorkerId};

#[derive(Default)]
struct Inner {
    shards: BTreeMap<ShardId, Shard>,
    next_id: i64,
    unavailable: bool,
}

impl Inner {
    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::unavailable("in-memory shard store switched off"));
        }
        Ok(())
    }
}

/// Shard store held behind a single async mutex
///
/// Every trait operation runs under the lock, so claims are as atomic as the
/// Postgres conditional update.
#[derive(Default)]
pub struct MemoryShardStore {
    inner: Mutex<Inner>,
}

impl MemoryShardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with shards, ids assigned in order from 1.
    pub async fn with_shards(shards: &[NewShard]) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().await;
            for shard in shards {
                inner.next_id += 1;
                let id = ShardId(inner.next_id);
                inner.shards.insert(
                    id,
                    Shard {
                        id,
                        window: shard.window,
                        license: shard.license,
                        owner: None,
                        progress: ShardProgress::NotStarted,
                    },
                );
            }
        }
        store
    }

    /// Place a shard with an explicit owner and progress, as if left behind
    /// by an earlier run.
    pub async fn put(&self, shard: Shard) {
        let mut inner = self.inner.lock().await;
        inner.next_id = inner.next_id.max(shard.id.0);
        inner.shards.insert(shard.id, shard);
    }

    pub async fn get(&self, id: ShardId) -> Option<Shard> {
        self.inner.lock().await.shards.get(&id).cloned()
    }

    pub async fn shards(&self) -> Vec<Shard> {
        self.inner.lock().await.shards.values().cloned().collect()
    }

    /// Make every subsequent operation fail until switched back on.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.unavailable = unavailable;
    }
}

#[async_trait]
impl ShardStore for MemoryShardStore {
    async fn claim_unfinished_owned_by(&self, worker: &WorkerId) -> StoreResult<Option<Shard>> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let owned = inner
            .shards
            .values()
            .filter(|s| s.owner.as_ref() == Some(worker) && !s.progress.is_finished());

        // Mid-pagination shards first, then lowest id
        let mut first_not_started = None;
        for shard in owned {
            if matches!(shard.progress, ShardProgress::InProgress(_)) {
                return Ok(Some(shard.clone()));
            }
            first_not_started.get_or_insert(shard);
        }

        Ok(first_not_started.cloned())
    }

    async fn claim_fresh_unowned(&self, worker: &WorkerId) -> StoreResult<Option<Shard>> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let candidate = inner
            .shards
            .values_mut()
            .find(|s| s.owner.is_none() && s.progress == ShardProgress::NotStarted);

        Ok(candidate.map(|shard| {
            shard.owner = Some(worker.clone());
            shard.clone()
        }))
    }

    async fn persist_progress(
        &self,
        shard_id: ShardId,
        worker: &WorkerId,
        progress: &ShardProgress,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        match inner.shards.get_mut(&shard_id) {
            Some(shard) if shard.owner.as_ref() == Some(worker) => {
                shard.progress = progress.clone();
                Ok(())
            }
            _ => Err(StoreError::OwnershipLost {
                shard_id,
                worker: worker.clone(),
            }),
        }
    }

    async fn insert_shards(&self, shards: &[NewShard]) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        inner.check_available()?;

        let mut created = 0;
        for new in shards {
            let exists = inner
                .shards
                .values()
                .any(|s| s.window == new.window && s.license == new.license);
            if exists {
                continue;
            }

            inner.next_id += 1;
            let id = ShardId(inner.next_id);
            inner.shards.insert(
                id,
                Shard {
                    id,
                    window: new.window,
                    license: new.license,
                    owner: None,
                    progress: ShardProgress::NotStarted,
                },
            );
            created += 1;
        }

        Ok(created)
    }

    async fn summary(&self) -> StoreResult<ShardSummary> {
        let inner = self.inner.lock().await;
        inner.check_available()?;

        let mut summary = ShardSummary::default();
        for shard in inner.shards.values() {
            match (&shard.owner, &shard.progress) {
                (None, _) => summary.unclaimed += 1,
                (Some(_), ShardProgress::NotStarted) => summary.not_started += 1,
                (Some(_), ShardProgress::InProgress(_)) => summary.in_progress += 1,
                (Some(_), ShardProgress::Finished) => summary.finished += 1,
            }
        }

        Ok(summary)
    }
}
