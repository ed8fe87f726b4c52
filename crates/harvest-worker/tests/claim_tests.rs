//! Claim protocol tests: exclusivity, resume-first ordering, and shard
//! lifecycles across several workers sharing one store.

mod common;

use common::*;
use harvest_common::types::License;
use harvest_worker::shard::{Cursor, Shard, ShardId, ShardProgress, WorkerId};
use harvest_worker::sink::MemoryRecordSink;
use harvest_worker::store::{MemoryShardStore, ShardStore};
use harvest_worker::Worker;
use std::collections::HashSet;
use std::sync::Arc;

const PAGE_SIZE: u32 = 100;

fn month_of_shards(days: u32) -> Vec<harvest_worker::shard::NewShard> {
    (1..=days)
        .map(|d| day_shard(date(2016, 3, d), License::CcBy))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fresh_claims_are_exclusive() {
    init_tracing();
    let store = Arc::new(MemoryShardStore::with_shards(&month_of_shards(20)).await);

    let mut handles = Vec::new();
    for n in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerId::new(format!("w{}", n));
            let mut claimed = Vec::new();
            while let Some(shard) = store.claim_fresh_unowned(&worker).await.unwrap() {
                assert_eq!(shard.owner.as_ref(), Some(&worker));
                claimed.push(shard.id);
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    let unique: HashSet<ShardId> = all.iter().copied().collect();

    assert_eq!(all.len(), 20);
    assert_eq!(unique.len(), 20);
    assert_eq!(store.summary().await.unwrap().unclaimed, 0);
}

#[tokio::test(start_paused = true)]
async fn test_owned_shards_are_finished_before_fresh_claims() {
    init_tracing();
    let shards = month_of_shards(3);
    let store = Arc::new(MemoryShardStore::new());
    // Shard 1 claimed but never started, shard 2 mid-pagination, shard 3 unowned
    for (i, shard) in shards.iter().enumerate() {
        let id = ShardId(i as i64 + 1);
        let (owner, progress) = match id.0 {
            1 => (Some(WorkerId::new("w1")), ShardProgress::NotStarted),
            2 => (
                Some(WorkerId::new("w1")),
                ShardProgress::InProgress(Cursor::new("s2-c1")),
            ),
            _ => (None, ShardProgress::NotStarted),
        };
        store
            .put(Shard {
                id,
                window: shard.window,
                license: shard.license,
                owner,
                progress,
            })
            .await;
    }

    let catalog = Arc::new(
        ScriptedCatalog::new()
            .script(cont("s2-c1"), vec![page(&["b"], None)])
            .script(initial(&shards[0], PAGE_SIZE), vec![page(&["a"], None)])
            .script(initial(&shards[2], PAGE_SIZE), vec![page(&["c"], None)]),
    );
    let sink = Arc::new(MemoryRecordSink::new());

    let summary = Worker::new(
        WorkerId::new("w1"),
        store.clone(),
        sink,
        catalog.clone(),
        &harvest_config(1),
        PAGE_SIZE,
    )
    .run()
    .await
    .unwrap();

    // In-progress first, then the claimed-not-started one, then fresh
    assert_eq!(
        catalog.requests(),
        vec![
            cont("s2-c1"),
            initial(&shards[0], PAGE_SIZE),
            initial(&shards[2], PAGE_SIZE),
        ]
    );
    assert_eq!(summary.resumed, 2);
    assert_eq!(summary.fresh, 1);
}

#[tokio::test(start_paused = true)]
async fn test_finished_and_foreign_shards_are_never_reclaimed() {
    init_tracing();
    let shards = month_of_shards(2);
    let store = Arc::new(MemoryShardStore::new());
    store
        .put(Shard {
            id: ShardId(1),
            window: shards[0].window,
            license: shards[0].license,
            owner: Some(WorkerId::new("w1")),
            progress: ShardProgress::Finished,
        })
        .await;
    store
        .put(Shard {
            id: ShardId(2),
            window: shards[1].window,
            license: shards[1].license,
            owner: Some(WorkerId::new("w2")),
            progress: ShardProgress::InProgress(Cursor::new("theirs")),
        })
        .await;

    let catalog = Arc::new(ScriptedCatalog::new());
    let summary = Worker::new(
        WorkerId::new("w1"),
        store.clone(),
        Arc::new(MemoryRecordSink::new()),
        catalog.clone(),
        &harvest_config(1),
        PAGE_SIZE,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.shards(), 0);
    assert!(catalog.calls().is_empty());
    assert_eq!(
        store.get(ShardId(2)).await.unwrap().progress,
        ShardProgress::InProgress(Cursor::new("theirs"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_workers_sharing_a_store_split_the_work() {
    init_tracing();
    let shards = month_of_shards(6);
    let mut catalog = ScriptedCatalog::new();
    for (i, shard) in shards.iter().enumerate() {
        let permalink = format!("day-{}", i);
        catalog = catalog.script(initial(shard, PAGE_SIZE), vec![page(&[permalink.as_str()], None)]);
    }
    let catalog = Arc::new(catalog);
    let store = Arc::new(MemoryShardStore::with_shards(&shards).await);
    let sink = Arc::new(MemoryRecordSink::new());

    let make = |id: &str| {
        Worker::new(
            WorkerId::new(id),
            store.clone(),
            sink.clone(),
            catalog.clone(),
            &harvest_config(1),
            PAGE_SIZE,
        )
    };
    let (a, b) = tokio::join!(make("w1").run(), make("w2").run());
    let (a, b) = (a.unwrap(), b.unwrap());

    // Every shard fetched exactly once across both workers
    assert_eq!(a.fresh + b.fresh, 6);
    assert_eq!(catalog.calls().len(), 6);
    assert_eq!(sink.len().await, 6);

    let summary = store.summary().await.unwrap();
    assert_eq!(summary.finished, 6);
    assert_eq!(summary.remaining(), 0);
}
