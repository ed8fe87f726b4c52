//! Shard descriptors and their explicit progress state

use harvest_common::types::{DateWindow, License};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Identifier assigned to a shard by the store on creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub i64);

impl std::fmt::Display for ShardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a worker process, as configured
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque continuation reference returned by the catalog API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(href: impl Into<String>) -> Self {
        Self(href.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Persisted status column of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStatus {
    NotStarted,
    InProgress,
    Finished,
}

impl ShardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardStatus::NotStarted => "not_started",
            ShardStatus::InProgress => "in_progress",
            ShardStatus::Finished => "finished",
        }
    }
}

impl std::str::FromStr for ShardStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(ShardStatus::NotStarted),
            "in_progress" => Ok(ShardStatus::InProgress),
            "finished" => Ok(ShardStatus::Finished),
            other => Err(StoreError::corrupt(format!("unknown shard status '{}'", other))),
        }
    }
}

/// Pagination progress of one shard
///
/// `NotStarted` and `Finished` both carry no cursor; they are told apart by
/// the persisted status rather than by call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardProgress {
    NotStarted,
    InProgress(Cursor),
    Finished,
}

impl ShardProgress {
    pub fn status(&self) -> ShardStatus {
        match self {
            ShardProgress::NotStarted => ShardStatus::NotStarted,
            ShardProgress::InProgress(_) => ShardStatus::InProgress,
            ShardProgress::Finished => ShardStatus::Finished,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            ShardProgress::InProgress(cursor) => Some(cursor),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, ShardProgress::Finished)
    }

    /// Rebuild progress from the `(status, cursor)` column pair.
    pub fn from_columns(status: &str, cursor: Option<String>) -> Result<Self, StoreError> {
        match (status.parse::<ShardStatus>()?, cursor) {
            (ShardStatus::NotStarted, None) => Ok(ShardProgress::NotStarted),
            (ShardStatus::InProgress, Some(href)) if !href.is_empty() => {
                Ok(ShardProgress::InProgress(Cursor::new(href)))
            }
            (ShardStatus::Finished, None) => Ok(ShardProgress::Finished),
            (status, cursor) => Err(StoreError::corrupt(format!(
                "status '{}' does not agree with cursor {:?}",
                status.as_str(),
                cursor
            ))),
        }
    }
}

/// A claimed shard, immutable for the duration of one fetch-loop run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub id: ShardId,
    pub window: DateWindow,
    pub license: License,
    pub owner: Option<WorkerId>,
    pub progress: ShardProgress,
}

/// Shard descriptor before the store has assigned it an id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NewShard {
    pub window: DateWindow,
    pub license: License,
}
