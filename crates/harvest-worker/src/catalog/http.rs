//! HTTP client for the catalog's `/tracks` endpoint

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CatalogApi, FetchError, FetchOutcome, Page, PageRequest};
use crate::config::CatalogConfig;
use crate::record::CatalogRecord;
use crate::shard::Cursor;

/// Timestamp format the catalog uses for `created_at`, e.g. `2016/02/06 10:00:00 +0000`.
const CATALOG_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S %z";

/// Catalog client authenticated by a public client id
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    client_id: String,
}

impl HttpCatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self, FetchError> {
        Self::new(
            config.base_url.clone(),
            config.client_id.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn tracks_url(&self) -> String {
        format!("{}/tracks", self.base_url)
    }

    async fn send(&self, request: &PageRequest) -> Result<reqwest::Response, FetchError> {
        let builder = match request {
            PageRequest::Initial {
                window,
                license,
                limit,
            } => {
                let (from, to) = window.api_bounds();
                let params: [(&str, String); 8] = [
                    ("client_id", self.client_id.clone()),
                    ("license", license.as_str().to_string()),
                    ("created_at[from]", from),
                    ("created_at[to]", to),
                    ("filter", "public".to_string()),
                    ("order", "created_at".to_string()),
                    ("limit", limit.to_string()),
                    ("linked_partitioning", "1".to_string()),
                ];
                self.client.get(self.tracks_url()).query(&params)
            }
            PageRequest::Continue(cursor) => {
                let url = Url::parse(cursor.as_str()).map_err(|e| {
                    FetchError::InvalidRequest(format!("bad continuation '{}': {}", cursor, e))
                })?;
                // The catalog's next_href does not always carry the credential
                let has_client_id = url.query_pairs().any(|(key, _)| key == "client_id");
                let builder = self.client.get(url);
                if has_client_id {
                    builder
                } else {
                    builder.query(&[("client_id", self.client_id.as_str())])
                }
            }
        };

        builder.send().await.map_err(transport_error)
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn fetch(&self, request: &PageRequest) -> Result<FetchOutcome, FetchError> {
        let response = self.send(request).await?;
        let status = response.status();

        if status.is_success() {
            let body: TracksPage = response
                .json()
                .await
                .map_err(|e| FetchError::Decode(e.to_string()))?;
            return Ok(FetchOutcome::Page(body.into_page()));
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(FetchError::Unauthorized {
                    status: status.as_u16(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            // The catalog answers a query past the end of its result set with
            // a client error rather than an empty page.
            s if s.is_client_error() => {
                debug!(status = s.as_u16(), body = %body, "Catalog signalled end of results");
                Ok(FetchOutcome::Exhausted)
            }
            s => Err(FetchError::Server {
                status: s.as_u16(),
                body,
            }),
        }
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_builder() {
        FetchError::InvalidRequest(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    collection: Vec<ApiTrack>,
    #[serde(default)]
    next_href: Option<String>,
}

impl TracksPage {
    fn into_page(self) -> Page {
        let records = self
            .collection
            .into_iter()
            .filter_map(ApiTrack::into_record)
            .collect();
        let next = self
            .next_href
            .filter(|href| !href.trim().is_empty())
            .and_then(|href| match Url::parse(&href) {
                Ok(_) => Some(Cursor::new(href)),
                Err(e) => {
                    warn!(next_href = %href, error = %e, "Ignoring unparsable continuation");
                    None
                }
            });

        Page { records, next }
    }
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    permalink_url: Option<String>,
    download_url: Option<String>,
    license: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default, deserialize_with = "catalog_timestamp")]
    created_at: Option<DateTime<Utc>>,
    genre: Option<String>,
    track_type: Option<String>,
    user: Option<ApiUser>,
    label_name: Option<String>,
}

impl ApiTrack {
    fn into_record(self) -> Option<CatalogRecord> {
        let Some(permalink_url) = self.permalink_url.filter(|p| !p.is_empty()) else {
            warn!(title = ?self.title, "Skipping catalog entry without a permalink");
            return None;
        };

        Some(
            CatalogRecord {
                permalink_url,
                download_url: self.download_url,
                license: self.license.unwrap_or_default(),
                title: self.title.unwrap_or_default(),
                description: self.description.unwrap_or_default(),
                created_at: self.created_at,
                genre: self.genre.unwrap_or_default(),
                track_type: self.track_type.unwrap_or_default(),
                username: self.user.and_then(|u| u.username).unwrap_or_default(),
                label_name: self.label_name.unwrap_or_default(),
            }
            .fit_columns(),
        )
    }
}

/// Accepts the catalog's own timestamp format or RFC 3339; anything else is
/// kept as unknown rather than failing the page.
fn catalog_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_catalog_timestamp))
}

fn parse_catalog_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(raw, CATALOG_TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
