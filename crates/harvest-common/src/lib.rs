//! Catalog Harvest Common Library
//!
//! Shared types, logging bootstrap, and error handling for the harvest
//! workspace.
//!
//! - **Error Handling**: [`HarvestError`] and the [`Result`] alias
//! - **Logging**: [`logging::init_logging`] driven by [`logging::LogConfig`]
//! - **Types**: value types shared by the shard table and the catalog API
//!
//! # Example
//!
//! ```
//! use harvest_common::types::{DateWindow, License};
//!
//! let license: License = "cc-by".parse().unwrap();
//! let window = DateWindow::for_day(chrono::NaiveDate::from_ymd_opt(2016, 2, 6).unwrap());
//! assert_eq!(license.as_str(), "cc-by");
//! assert_eq!(window.api_bounds().0, "2016-02-06 00:00:00");
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

pub use error::{HarvestError, Result};
