//! Shared fixtures for harvest worker integration tests
//!
//! [`ScriptedCatalog`] stands in for the remote API: each request shape has a
//! queue of canned outcomes, the last of which repeats once the queue is
//! drained. Every call is recorded with the (possibly paused) tokio clock so
//! tests can assert on pacing.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use harvest_common::types::{DateWindow, License};
use harvest_worker::catalog::{CatalogApi, FetchError, FetchOutcome, Page, PageRequest};
use harvest_worker::config::HarvestConfig;
use harvest_worker::record::CatalogRecord;
use harvest_worker::shard::{Cursor, NewShard};
use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use tokio::time::Instant;

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary; output only shows for
/// failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("harvest_worker=debug")
            .with_test_writer()
            .try_init();
    });
}

pub type Scripted = Result<FetchOutcome, FetchError>;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub at: Instant,
    pub request: PageRequest,
}

#[derive(Default)]
pub struct ScriptedCatalog {
    scripts: Mutex<Vec<(PageRequest, VecDeque<Scripted>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue outcomes for `request`; the last one repeats forever.
    pub fn script(self, request: PageRequest, outcomes: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .push((request, outcomes.into_iter().collect()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.calls().into_iter().map(|c| c.request).collect()
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchOutcome, FetchError> {
        self.calls.lock().unwrap().push(RecordedCall {
            at: Instant::now(),
            request: request.clone(),
        });

        let mut scripts = self.scripts.lock().unwrap();
        let Some((_, queue)) = scripts.iter_mut().find(|(r, _)| r == request) else {
            return Err(FetchError::InvalidRequest(format!(
                "no scripted response for {:?}",
                request
            )));
        };

        match queue.len() {
            0 => Err(FetchError::InvalidRequest("empty script".to_string())),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap(),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day_shard(day: NaiveDate, license: License) -> NewShard {
    NewShard {
        window: DateWindow::for_day(day),
        license,
    }
}

pub fn initial(shard: &NewShard, limit: u32) -> PageRequest {
    PageRequest::Initial {
        window: shard.window,
        license: shard.license,
        limit,
    }
}

pub fn cont(href: &str) -> PageRequest {
    PageRequest::Continue(Cursor::new(href))
}

pub fn record(permalink: &str) -> CatalogRecord {
    CatalogRecord {
        permalink_url: permalink.to_string(),
        download_url: None,
        license: "cc-by".to_string(),
        title: format!("title of {}", permalink),
        description: String::new(),
        created_at: None,
        genre: "ambient".to_string(),
        track_type: String::new(),
        username: "uploader".to_string(),
        label_name: String::new(),
    }
}

/// A page holding one record per permalink, continuing to `next`.
pub fn page(permalinks: &[&str], next: Option<&str>) -> Scripted {
    Ok(FetchOutcome::Page(Page {
        records: permalinks.iter().map(|p| record(p)).collect(),
        next: next.map(Cursor::new),
    }))
}

pub fn exhausted() -> Scripted {
    Ok(FetchOutcome::Exhausted)
}

pub fn failure(err: FetchError) -> Scripted {
    Err(err)
}

pub fn harvest_config(max_retries: u32) -> HarvestConfig {
    HarvestConfig {
        min_call_interval_ms: 1001,
        max_retries,
        retry_cooldown_secs: 60,
    }
}
