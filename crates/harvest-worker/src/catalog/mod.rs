//! Remote catalog API boundary
//!
//! A fetch has three outcomes: a page of records (possibly with a
//! continuation), exhaustion of the result set, or an error. Exhaustion is a
//! normal value, not an error, even though the API signals it with a client
//! error status.

pub mod http;

use async_trait::async_trait;
use harvest_common::types::{DateWindow, License};
use thiserror::Error;

use crate::record::CatalogRecord;
use crate::shard::Cursor;

pub use http::HttpCatalogClient;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// One request against the paginated endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// First page of a shard: window and license filters, page-size limit
    Initial {
        window: DateWindow,
        license: License,
        limit: u32,
    },
    /// Follow a continuation reference exactly as returned, with no filters
    Continue(Cursor),
}

/// A page of records and the reference to the next one, if any
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub records: Vec<CatalogRecord>,
    pub next: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Page(Page),
    /// The result set has no further pages
    Exhausted,
}

/// Failures of a single fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error talking to the catalog: {0}")]
    Network(String),

    #[error("Catalog request timed out")]
    Timeout,

    #[error("Catalog rate limit exceeded (429)")]
    RateLimited,

    #[error("Catalog server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Undecodable catalog response: {0}")]
    Decode(String),

    #[error("Catalog rejected the API credential ({status}). Check CATALOG_CLIENT_ID.")]
    Unauthorized { status: u16 },

    #[error("Invalid catalog request: {0}")]
    InvalidRequest(String),
}

/// Paginated read access to the remote catalog
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchOutcome, FetchError>;
}
