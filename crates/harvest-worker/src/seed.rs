//! Shard planning: one shard per UTC day and license

use chrono::{Days, NaiveDate};
use harvest_common::types::{DateWindow, License};
use harvest_common::HarvestError;
use tracing::info;

use crate::error::StoreResult;
use crate::shard::NewShard;
use crate::store::ShardStore;

/// First day the catalog has public uploads for.
pub const DEFAULT_SEED_START: &str = "2008-10-17";

/// Plan shards for every day in `[start, end)` crossed with `licenses`.
///
/// Days are the outer loop, so shard ids assigned in insertion order walk
/// the calendar forwards.
pub fn plan_shards(
    start: NaiveDate,
    end: NaiveDate,
    licenses: &[License],
) -> Result<Vec<NewShard>, HarvestError> {
    if start > end {
        return Err(HarvestError::InvalidWindow {
            from: start.to_string(),
            to: end.to_string(),
        });
    }

    let mut shards = Vec::new();
    let mut day = start;
    while day < end {
        let window = DateWindow::for_day(day);
        shards.extend(licenses.iter().map(|&license| NewShard { window, license }));
        day = match day.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(shards)
}

/// Insert planned shards, skipping those already present. Returns the number
/// of shards created.
pub async fn seed(store: &dyn ShardStore, shards: &[NewShard]) -> StoreResult<u64> {
    let created = store.insert_shards(shards).await?;
    info!(
        planned = shards.len(),
        created,
        skipped = shards.len() as u64 - created,
        "Seeded shards"
    );
    Ok(created)
}
