//! Error types for the harvest worker
//!
//! Exhaustion of a shard is not an error and never appears here; transient
//! catalog failures are absorbed by the fetch loop. What escapes to the run
//! loop is either a storage failure or a fatal catalog error, and both end
//! the process.

use thiserror::Error;

use crate::catalog::FetchError;
use crate::config::ConfigError;
use crate::shard::{ShardId, WorkerId};

/// Result type alias for store and sink operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of the shard store or the record sink
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQL query or connection error
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migrations could not be applied
    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A progress update found no row owned by the worker
    #[error("Shard {shard_id} is no longer owned by worker '{worker}'")]
    OwnershipLost { shard_id: ShardId, worker: WorkerId },

    /// A stored row violates the shard invariants
    #[error("Corrupt shard row: {0}")]
    Corrupt(String),

    /// Store cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Errors that stop the worker run loop
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Storage failure while processing shard {shard_id}: {source}")]
    ShardStorage {
        shard_id: ShardId,
        #[source]
        source: StoreError,
    },

    #[error("Fatal catalog error on shard {shard_id}: {source}")]
    Fatal {
        shard_id: ShardId,
        #[source]
        source: FetchError,
    },

    /// Storage failure outside any one shard: connecting or claiming
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl WorkerError {
    pub fn shard_storage(shard_id: ShardId, source: StoreError) -> Self {
        Self::ShardStorage { shard_id, source }
    }

    pub fn fatal(shard_id: ShardId, source: FetchError) -> Self {
        Self::Fatal { shard_id, source }
    }

    /// Shard the error happened on, when it is shard-scoped.
    pub fn shard_id(&self) -> Option<ShardId> {
        match self {
            WorkerError::ShardStorage { shard_id, .. } | WorkerError::Fatal { shard_id, .. } => {
                Some(*shard_id)
            }
            _ => None,
        }
    }
}
