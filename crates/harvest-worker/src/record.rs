//! Harvested catalog records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Column widths of the catalog_records table.
const PERMALINK_MAX: usize = 255;
const DOWNLOAD_URL_MAX: usize = 255;
const LICENSE_MAX: usize = 20;
const TITLE_MAX: usize = 100;
const GENRE_MAX: usize = 255;
const TRACK_TYPE_MAX: usize = 14;
const USERNAME_MAX: usize = 25;
const LABEL_NAME_MAX: usize = 255;

/// One catalog entry, keyed by its public permalink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Natural key; unique in storage
    pub permalink_url: String,
    pub download_url: Option<String>,
    pub license: String,
    pub title: String,
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
    pub genre: String,
    pub track_type: String,
    /// Author identifier
    pub username: String,
    pub label_name: String,
}

impl CatalogRecord {
    /// Clip every bounded column to its width so an over-long field from the
    /// API never fails an insert.
    pub fn fit_columns(self) -> Self {
        Self {
            permalink_url: clip(self.permalink_url, PERMALINK_MAX),
            download_url: self.download_url.map(|u| clip(u, DOWNLOAD_URL_MAX)),
            license: clip(self.license, LICENSE_MAX),
            title: clip(self.title, TITLE_MAX),
            description: self.description,
            created_at: self.created_at,
            genre: clip(self.genre, GENRE_MAX),
            track_type: clip(self.track_type, TRACK_TYPE_MAX),
            username: clip(self.username, USERNAME_MAX),
            label_name: clip(self.label_name, LABEL_NAME_MAX),
        }
    }
}

/// Truncate to at most `max` characters, never splitting a code point.
fn clip(value: String, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value,
    }
}
