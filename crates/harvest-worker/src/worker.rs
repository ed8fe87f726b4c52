//! Worker run loop: claim a shard, harvest it, repeat until drained

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::catalog::CatalogApi;
use crate::config::HarvestConfig;
use crate::coordinator::{ClaimCoordinator, ClaimSource};
use crate::error::WorkerError;
use crate::fetch_loop::{PaginatedFetchLoop, ShardReport};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;
use crate::shard::WorkerId;
use crate::sink::IngestSink;
use crate::store::ShardStore;

/// Totals over one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Shards resumed from an earlier run of this worker
    pub resumed: u64,
    /// Shards claimed fresh during this run
    pub fresh: u64,
    pub pages: u64,
    pub inserted: u64,
    pub duplicates: u64,
    /// Shards finished early after the retry budget ran out
    pub gave_up: u64,
}

impl RunSummary {
    pub fn shards(&self) -> u64 {
        self.resumed + self.fresh
    }

    fn record(&mut self, source: ClaimSource, report: &ShardReport) {
        match source {
            ClaimSource::Resumed => self.resumed += 1,
            ClaimSource::Fresh => self.fresh += 1,
        }
        self.pages += report.pages;
        self.inserted += report.inserted;
        self.duplicates += report.duplicates;
        if report.gave_up {
            self.gave_up += 1;
        }
    }
}

/// One harvesting process bound to a single worker identity
pub struct Worker {
    coordinator: ClaimCoordinator,
    fetch_loop: PaginatedFetchLoop,
}

impl Worker {
    pub fn new(
        worker_id: WorkerId,
        store: Arc<dyn ShardStore>,
        sink: Arc<dyn IngestSink>,
        catalog: Arc<dyn CatalogApi>,
        harvest: &HarvestConfig,
        page_size: u32,
    ) -> Self {
        let fetch_loop = PaginatedFetchLoop::new(catalog, store.clone(), sink, worker_id.clone())
            .with_rate_limiter(RateLimiter::new(harvest.min_call_interval()))
            .with_retry_policy(RetryPolicy::new(
                harvest.max_retries,
                harvest.retry_cooldown(),
            ))
            .with_page_size(page_size);

        Self {
            coordinator: ClaimCoordinator::new(store, worker_id),
            fetch_loop,
        }
    }

    pub fn worker_id(&self) -> &WorkerId {
        self.coordinator.worker()
    }

    /// Process shards until none are owned-and-unfinished and none are
    /// unowned. Storage failures and fatal catalog errors end the run.
    pub async fn run(mut self) -> Result<RunSummary, WorkerError> {
        let worker = self.worker_id().clone();
        info!(worker = %worker, "Worker started");

        let mut summary = RunSummary::default();
        loop {
            let claimed = match self.coordinator.next_shard().await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => break,
                Err(e) => {
                    error!(worker = %worker, error = %e, "Failed to claim a shard");
                    return Err(WorkerError::Storage(e));
                }
            };

            let shard = &claimed.shard;
            info!(
                shard_id = %shard.id,
                window = %shard.window,
                license = %shard.license,
                source = ?claimed.source,
                "Processing shard"
            );

            match self.fetch_loop.run(shard).await {
                Ok(report) => summary.record(claimed.source, &report),
                Err(e) => {
                    error!(
                        worker = %worker,
                        shard_id = %shard.id,
                        error = %e,
                        "Shard processing aborted"
                    );
                    return Err(e);
                }
            }
        }

        info!(
            worker = %worker,
            shards = summary.shards(),
            resumed = summary.resumed,
            fresh = summary.fresh,
            pages = summary.pages,
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            gave_up = summary.gave_up,
            "Worker finished, no shards left"
        );
        Ok(summary)
    }
}
