//! Distributed harvesting of a paginated catalog API
//!
//! Work is split into shards (one day of uploads under one license). Any
//! number of worker processes share a shard table; each claims shards
//! atomically, resumes shards it already owns first, and pages through the
//! catalog while persisting its cursor after every page.
//!
//! The pieces, bottom up:
//!
//! - [`rate_limit::RateLimiter`] spaces catalog calls
//! - [`retry::RetryPolicy`] decides what a failed fetch means
//! - [`store::ShardStore`] and [`sink::IngestSink`] are the durable state
//! - [`coordinator::ClaimCoordinator`] picks the next shard
//! - [`fetch_loop::PaginatedFetchLoop`] harvests one shard
//! - [`worker::Worker`] runs until nothing is left

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod error;
pub mod fetch_loop;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod seed;
pub mod shard;
pub mod sink;
pub mod store;
pub mod worker;

pub use error::{StoreError, WorkerError};
pub use worker::{RunSummary, Worker};
