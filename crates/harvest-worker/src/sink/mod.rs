//! Destination for harvested records
//!
//! Records are keyed by permalink. Inserting one that is already stored is a
//! normal outcome, which makes re-fetching a page after a crash harmless.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::record::CatalogRecord;

pub use memory::MemoryRecordSink;
pub use postgres::PgRecordSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same permalink already exists; nothing was written
    Duplicate,
}

#[async_trait]
pub trait IngestSink: Send + Sync {
    async fn insert(&self, record: &CatalogRecord) -> StoreResult<InsertOutcome>;
}
