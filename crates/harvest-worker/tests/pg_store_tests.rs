//! Postgres shard store and record sink tests
//!
//! These run against the database named by `DATABASE_URL` and skip
//! themselves when it is not set. They truncate the harvest tables, so point
//! them at a scratch database.

mod common;

use common::*;
use harvest_common::types::License;
use harvest_worker::config::DatabaseConfig;
use harvest_worker::db;
use harvest_worker::error::StoreError;
use harvest_worker::shard::{Cursor, ShardProgress, WorkerId};
use harvest_worker::sink::{IngestSink, InsertOutcome, PgRecordSink};
use harvest_worker::store::{PgShardStore, ShardStore};
use serial_test::serial;
use sqlx::PgPool;
use std::collections::HashSet;

async fn setup_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        max_connections: 8,
        ..DatabaseConfig::default()
    };

    let pool = db::connect(&config).await.expect("Failed to connect to database");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    sqlx::query("TRUNCATE harvest_shards, catalog_records RESTART IDENTITY")
        .execute(&pool)
        .await
        .expect("Failed to truncate tables");
    Some(pool)
}

fn march(days: u32) -> Vec<harvest_worker::shard::NewShard> {
    (1..=days)
        .map(|d| day_shard(date(2016, 3, d), License::CcBy))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn test_pg_concurrent_claims_are_exclusive() {
    let Some(pool) = setup_pool().await else {
        println!("Skipping test: DATABASE_URL not configured");
        return;
    };
    let store = PgShardStore::new(pool);
    assert_eq!(store.insert_shards(&march(30)).await.unwrap(), 30);

    let mut handles = Vec::new();
    for n in 0..6 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let worker = WorkerId::new(format!("pg-w{}", n));
            let mut claimed = Vec::new();
            while let Some(shard) = store.claim_fresh_unowned(&worker).await.unwrap() {
                claimed.push(shard.id);
            }
            claimed
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    let unique: HashSet<_> = all.iter().copied().collect();
    assert_eq!(all.len(), 30);
    assert_eq!(unique.len(), 30);
}

#[tokio::test]
#[serial]
async fn test_pg_progress_round_trip_and_resume_order() {
    let Some(pool) = setup_pool().await else {
        println!("Skipping test: DATABASE_URL not configured");
        return;
    };
    let store = PgShardStore::new(pool);
    store.insert_shards(&march(2)).await.unwrap();
    let worker = WorkerId::new("pg-w1");

    let first = store.claim_fresh_unowned(&worker).await.unwrap().unwrap();
    let second = store.claim_fresh_unowned(&worker).await.unwrap().unwrap();
    assert_eq!(first.progress, ShardProgress::NotStarted);

    let cursor = ShardProgress::InProgress(Cursor::new("https://api.example/tracks?cursor=x"));
    store.persist_progress(second.id, &worker, &cursor).await.unwrap();

    let resumed = store.claim_unfinished_owned_by(&worker).await.unwrap().unwrap();
    assert_eq!(resumed.id, second.id);
    assert_eq!(resumed.progress, cursor);
    assert_eq!(resumed.window, second.window);

    store
        .persist_progress(second.id, &worker, &ShardProgress::Finished)
        .await
        .unwrap();
    let resumed = store.claim_unfinished_owned_by(&worker).await.unwrap().unwrap();
    assert_eq!(resumed.id, first.id);

    let summary = store.summary().await.unwrap();
    assert_eq!(summary.not_started, 1);
    assert_eq!(summary.finished, 1);
    assert_eq!(summary.unclaimed, 0);
}

#[tokio::test]
#[serial]
async fn test_pg_persist_requires_ownership() {
    let Some(pool) = setup_pool().await else {
        println!("Skipping test: DATABASE_URL not configured");
        return;
    };
    let store = PgShardStore::new(pool);
    store.insert_shards(&march(1)).await.unwrap();
    let shard = store
        .claim_fresh_unowned(&WorkerId::new("pg-w1"))
        .await
        .unwrap()
        .unwrap();

    let err = store
        .persist_progress(shard.id, &WorkerId::new("pg-w2"), &ShardProgress::Finished)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::OwnershipLost { .. }));
}

#[tokio::test]
#[serial]
async fn test_pg_seeding_is_idempotent() {
    let Some(pool) = setup_pool().await else {
        println!("Skipping test: DATABASE_URL not configured");
        return;
    };
    let store = PgShardStore::new(pool);

    assert_eq!(store.insert_shards(&march(3)).await.unwrap(), 3);
    assert_eq!(store.insert_shards(&march(4)).await.unwrap(), 1);
    assert_eq!(store.summary().await.unwrap().total(), 4);
}

#[tokio::test]
#[serial]
async fn test_pg_sink_absorbs_duplicate_permalinks() {
    let Some(pool) = setup_pool().await else {
        println!("Skipping test: DATABASE_URL not configured");
        return;
    };
    let sink = PgRecordSink::new(pool.clone());
    let record = record("https://catalog.example/u/one").fit_columns();

    assert_eq!(sink.insert(&record).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(sink.insert(&record).await.unwrap(), InsertOutcome::Duplicate);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM catalog_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
