//! Granule filename parsing and the per-file dynamic attributes
//!
//! Granule names look like
//! `M2OCEAN_S2SV3.ocn_tavg_1mo_glo_T1440x1080_slv.19980201_0000z.nc4`: the second
//! dot-separated field is the science product name and the second-to-last field
//! starts with a `YYYYMMDD` (or `YYYYMM`) date.

use crate::errors::{MetaError, Result};
use crate::value::AttributeSet;
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Start of the covered day range
pub const BEGIN_TIME: &str = "00:00:00.0000";

/// End of the covered day range
pub const END_TIME: &str = "23:59:59.9999";

/// `ProductionDateTime` layout
pub const PRODUCTION_TIME_FORMAT: &str = "%Y%m%dT%H:%M:%SZ";

/// Calendar span covered by one granule: one month starting at `begin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// One calendar month from `begin`, ending the day before the same day next month.
    ///
    /// A start day that does not exist in the following month (e.g. January 31)
    /// has no such range.
    pub fn monthly(begin: NaiveDate) -> Option<Self> {
        let next = begin.checked_add_months(Months::new(1))?;
        if next.day() != begin.day() {
            return None;
        }
        let end = next.pred_opt()?;
        Some(Self { begin, end })
    }

    pub fn begin_date(&self) -> String {
        self.begin.format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

/// Pad a 6-digit `YYYYMM` token to `YYYYMM01`; 8 digits pass through.
pub fn normalize_date_token(token: &str) -> Option<String> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match token.len() {
        6 => Some(format!("{}01", token)),
        8 => Some(token.to_string()),
        _ => None,
    }
}

/// Turn a compact date token into a calendar date
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let digits = normalize_date_token(token)?;
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Fields extracted from a granule basename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GranuleName {
    pub basename: String,
    pub product: String,
    pub date_token: String,
    pub range: DateRange,
}

impl GranuleName {
    pub fn parse(basename: &str) -> Result<Self> {
        let fields: Vec<&str> = basename.split('.').collect();
        if fields.len() < 2 {
            return Err(MetaError::InvalidFilename {
                filename: basename.to_string(),
            });
        }
        let product = fields[1].to_string();
        let date_token = fields[fields.len() - 2]
            .split('_')
            .next()
            .unwrap_or_default()
            .to_string();

        let range = parse_date_token(&date_token)
            .and_then(DateRange::monthly)
            .ok_or_else(|| MetaError::InvalidDateToken {
                filename: basename.to_string(),
                token: date_token.clone(),
            })?;

        Ok(Self {
            basename: basename.to_string(),
            product,
            date_token,
            range,
        })
    }

    /// Per-file attributes written before any table-driven ones
    pub fn dynamic_attributes(&self, short_name: &str, production_time: &str) -> AttributeSet {
        let mut attrs = AttributeSet::new();
        attrs.insert("Title", short_name);
        attrs.insert("GranuleID", self.basename.as_str());
        attrs.insert("Filename", self.basename.as_str());
        attrs.insert("ProductionDateTime", production_time);
        attrs.insert("RangeBeginningDate", self.range.begin_date());
        attrs.insert("RangeBeginningTime", BEGIN_TIME);
        attrs.insert("RangeEndingDate", self.range.end_date());
        attrs.insert("RangeEndingTime", END_TIME);
        attrs
    }
}

pub fn production_datetime(now: DateTime<Utc>) -> String {
    now.format(PRODUCTION_TIME_FORMAT).to_string()
}
