//! Value types shared by the shard table and the catalog API

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HarvestError, Result};

/// Format the catalog API expects for `created_at[from]` / `created_at[to]`.
pub const API_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// License filter a shard is bounded by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum License {
    NoRightsReserved,
    AllRightsReserved,
    CcBy,
    CcByNc,
    CcByNd,
    CcBySa,
    CcByNcNd,
    CcByNcSa,
}

impl License {
    pub const ALL: [License; 8] = [
        License::NoRightsReserved,
        License::AllRightsReserved,
        License::CcBy,
        License::CcByNc,
        License::CcByNd,
        License::CcBySa,
        License::CcByNcNd,
        License::CcByNcSa,
    ];

    /// Licenses seeded by default.
    ///
    /// `no-rights-reserved` and `cc-by-nc` are left out because the catalog
    /// answers every query for them with a 400.
    pub const SEEDED: [License; 5] = [
        License::CcBy,
        License::CcByNd,
        License::CcBySa,
        License::CcByNcNd,
        License::CcByNcSa,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            License::NoRightsReserved => "no-rights-reserved",
            License::AllRightsReserved => "all-rights-reserved",
            License::CcBy => "cc-by",
            License::CcByNc => "cc-by-nc",
            License::CcByNd => "cc-by-nd",
            License::CcBySa => "cc-by-sa",
            License::CcByNcNd => "cc-by-nc-nd",
            License::CcByNcSa => "cc-by-nc-sa",
        }
    }

    pub(crate) fn known_list() -> String {
        Self::ALL
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::str::FromStr for License {
    type Err = HarvestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == needle)
            .ok_or_else(|| HarvestError::InvalidLicense(s.to_string()))
    }
}

impl std::fmt::Display for License {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive UTC time window `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(HarvestError::InvalidWindow {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(Self { from, to })
    }

    /// Window covering one UTC calendar day, `00:00:00` through `23:59:59`.
    pub fn for_day(day: NaiveDate) -> Self {
        let from = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
        let to = from + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
        Self { from, to }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Bounds rendered the way the catalog API filter expects them.
    pub fn api_bounds(&self) -> (String, String) {
        (
            self.from.format(API_DATETIME_FORMAT).to_string(),
            self.to.format(API_DATETIME_FORMAT).to_string(),
        )
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (from, to) = self.api_bounds();
        write!(f, "[{from} .. {to}]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_license_round_trips_through_str() {
        for license in License::ALL {
            assert_eq!(license.as_str().parse::<License>().unwrap(), license);
        }
        assert_eq!(" CC-BY ".parse::<License>().unwrap(), License::CcBy);
    }

    #[test]
    fn test_unknown_license_lists_known_values() {
        let err = "public-domain".parse::<License>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("public-domain"));
        assert!(msg.contains("cc-by-nc-sa"));
    }

    #[test]
    fn test_license_serde_uses_kebab_case() {
        let json = serde_json::to_string(&License::CcByNcNd).unwrap();
        assert_eq!(json, "\"cc-by-nc-nd\"");
    }

    #[test]
    fn test_day_window_is_inclusive_to_last_second() {
        let window = DateWindow::for_day(NaiveDate::from_ymd_opt(2016, 2, 6).unwrap());
        let (from, to) = window.api_bounds();
        assert_eq!(from, "2016-02-06 00:00:00");
        assert_eq!(to, "2016-02-06 23:59:59");
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        let later = Utc.with_ymd_and_hms(2016, 2, 7, 0, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2016, 2, 6, 0, 0, 0).unwrap();
        assert!(DateWindow::new(later, earlier).is_err());
        assert!(DateWindow::new(earlier, later).is_ok());
        assert!(DateWindow::new(earlier, earlier).is_ok());
    }
}
