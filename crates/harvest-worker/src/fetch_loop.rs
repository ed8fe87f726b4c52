//! Paginated harvesting of one shard
//!
//! The loop fetches a page, hands every record to the sink, and only then
//! persists the next cursor. A crash between those steps re-fetches the last
//! page on resume; the sink absorbs the duplicates.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogApi, FetchOutcome, Page, PageRequest, DEFAULT_PAGE_SIZE};
use crate::error::WorkerError;
use crate::rate_limit::RateLimiter;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::shard::{Shard, ShardId, ShardProgress, WorkerId};
use crate::sink::{IngestSink, InsertOutcome};
use crate::store::ShardStore;

/// Counters for one shard run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardReport {
    pub shard_id: ShardId,
    pub pages: u64,
    pub inserted: u64,
    pub duplicates: u64,
    /// The retry budget ran out and the shard was finished early
    pub gave_up: bool,
}

impl ShardReport {
    pub fn new(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            pages: 0,
            inserted: 0,
            duplicates: 0,
            gave_up: false,
        }
    }
}

/// Drives a claimed shard from its persisted progress to `Finished`
pub struct PaginatedFetchLoop {
    catalog: Arc<dyn CatalogApi>,
    store: Arc<dyn ShardStore>,
    sink: Arc<dyn IngestSink>,
    worker: WorkerId,
    limiter: RateLimiter,
    retry: RetryPolicy,
    page_size: u32,
}

impl PaginatedFetchLoop {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        store: Arc<dyn ShardStore>,
        sink: Arc<dyn IngestSink>,
        worker: WorkerId,
    ) -> Self {
        Self {
            catalog,
            store,
            sink,
            worker,
            limiter: RateLimiter::default(),
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Harvest `shard` until it is finished.
    ///
    /// Starts from the shard's persisted progress: the initial filtered query
    /// for `NotStarted`, the stored cursor for `InProgress`. Returns an error
    /// only for storage failures and fatal catalog errors; transient failures
    /// are retried, and a spent retry budget finishes the shard.
    #[tracing::instrument(
        skip(self, shard),
        fields(shard_id = %shard.id, window = %shard.window, license = %shard.license)
    )]
    pub async fn run(&mut self, shard: &Shard) -> Result<ShardReport, WorkerError> {
        let mut report = ShardReport::new(shard.id);
        let mut progress = shard.progress.clone();
        let mut retries = 0u32;

        loop {
            let request = match &progress {
                ShardProgress::NotStarted => PageRequest::Initial {
                    window: shard.window,
                    license: shard.license,
                    limit: self.page_size,
                },
                ShardProgress::InProgress(cursor) => PageRequest::Continue(cursor.clone()),
                ShardProgress::Finished => break,
            };

            self.limiter.wait_turn().await;
            let outcome = self.catalog.fetch(&request).await;

            let next = match outcome {
                Ok(FetchOutcome::Page(page)) => {
                    retries = 0;
                    report.pages += 1;
                    self.ingest(shard.id, &page, &mut report).await?;
                    next_progress(&progress, page)
                }
                Ok(FetchOutcome::Exhausted) => {
                    debug!("Result set exhausted");
                    ShardProgress::Finished
                }
                Err(err) => match self.retry.decide(retries, &err) {
                    RetryDecision::RetryAfter(cooldown) => {
                        retries += 1;
                        warn!(
                            error = %err,
                            attempt = retries,
                            max_retries = self.retry.max_retries(),
                            cooldown_secs = cooldown.as_secs_f64(),
                            "Catalog fetch failed, retrying after cool-down"
                        );
                        tokio::time::sleep(cooldown).await;
                        continue;
                    }
                    RetryDecision::GiveUp => {
                        error!(
                            error = %err,
                            retries,
                            "Catalog fetch kept failing, giving up on shard"
                        );
                        report.gave_up = true;
                        ShardProgress::Finished
                    }
                    RetryDecision::Abort => {
                        error!(error = %err, "Fatal catalog error");
                        return Err(WorkerError::fatal(shard.id, err));
                    }
                },
            };

            self.store
                .persist_progress(shard.id, &self.worker, &next)
                .await
                .map_err(|e| WorkerError::shard_storage(shard.id, e))?;
            progress = next;
        }

        info!(
            pages = report.pages,
            inserted = report.inserted,
            duplicates = report.duplicates,
            gave_up = report.gave_up,
            "Shard finished"
        );
        Ok(report)
    }

    async fn ingest(
        &self,
        shard_id: ShardId,
        page: &Page,
        report: &mut ShardReport,
    ) -> Result<(), WorkerError> {
        for record in &page.records {
            let outcome = self
                .sink
                .insert(record)
                .await
                .map_err(|e| WorkerError::shard_storage(shard_id, e))?;

            match outcome {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::Duplicate => {
                    debug!(permalink = %record.permalink_url, "Record already stored");
                    report.duplicates += 1;
                }
            }
        }

        Ok(())
    }
}

/// Progress after a successfully ingested page.
fn next_progress(current: &ShardProgress, page: Page) -> ShardProgress {
    match page.next {
        // A continuation pointing back at the page just read would loop forever
        Some(next) if current.cursor() == Some(&next) => {
            warn!(cursor = %next, "Catalog returned the same continuation, finishing shard");
            ShardProgress::Finished
        }
        Some(next) => ShardProgress::InProgress(next),
        None => ShardProgress::Finished,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::shard::Cursor;

    #[test]
    fn test_next_progress_follows_continuation() {
        let page = Page {
            records: vec![],
            next: Some(Cursor::new("c2")),
        };
        let current = ShardProgress::InProgress(Cursor::new("c1"));
        assert_eq!(
            next_progress(&current, page),
            ShardProgress::InProgress(Cursor::new("c2"))
        );
    }

    #[test]
    fn test_last_page_finishes_shard() {
        assert_eq!(
            next_progress(&ShardProgress::NotStarted, Page::default()),
            ShardProgress::Finished
        );
    }

    #[test]
    fn test_repeated_continuation_finishes_shard() {
        let page = Page {
            records: vec![],
            next: Some(Cursor::new("c1")),
        };
        let current = ShardProgress::InProgress(Cursor::new("c1"));
        assert_eq!(next_progress(&current, page), ShardProgress::Finished);
    }
}
