//! Reporting periods and the label formats derived from them.
//!
//! Every source keys its rows by some textual rendering of a period:
//!
//! - monthly time-series cards use the month start (`2025-01-01`)
//! - YTD scalar cards use the calendar-year start (`2025-01-01`)
//! - the AUM card uses a short English label (`Jan-25`)
//!
//! All of these are derived here so the normalizer never formats dates itself.

use std::fmt;

use chrono::{Datelike, Local};
use serde::{Serialize, Serializer};
use thiserror::Error;

pub(crate) const MONTH_ABBR: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTH_NAMES_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const MONTH_NAMES_ET: [&str; 12] = [
    "jaanuar",
    "veebruar",
    "märts",
    "aprill",
    "mai",
    "juuni",
    "juuli",
    "august",
    "september",
    "oktoober",
    "november",
    "detsember",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("month must be in 1..=12, got {0}")]
    MonthOutOfRange(u32),
}

/// One reporting cycle: a year, or a month within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: Option<u32>,
}

impl Period {
    pub fn monthly(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange(month));
        }
        Ok(Self {
            year,
            month: Some(month),
        })
    }

    pub fn annual(year: i32) -> Self {
        Self { year, month: None }
    }

    /// The current calendar month (local time).
    pub fn current_month() -> Self {
        let today = Local::now().date_naive();
        Self {
            year: today.year(),
            month: Some(today.month()),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    /// Month number, January for annual periods.
    fn month_or_first(&self) -> u32 {
        self.month.unwrap_or(1)
    }

    /// Month-start key used by monthly time-series cards, e.g. `2025-01-01`.
    pub fn month_start_key(&self) -> String {
        format!("{}-{:02}-01", self.year, self.month_or_first())
    }

    /// Year-start key used by YTD cards, e.g. `2025-01-01`.
    pub fn year_start_key(&self) -> String {
        format!("{}-01-01", self.year)
    }

    pub fn prev_year_start_key(&self) -> String {
        format!("{}-01-01", self.year - 1)
    }

    /// Short month label used by the AUM card, e.g. `Jan-25`.
    pub fn month_label(&self) -> String {
        let idx = (self.month_or_first() - 1) as usize;
        format!("{}-{:02}", MONTH_ABBR[idx], self.year.rem_euclid(100))
    }

    pub fn month_name_et(&self) -> Option<&'static str> {
        self.month.map(|m| MONTH_NAMES_ET[(m - 1) as usize])
    }

    pub fn month_name_en(&self) -> Option<&'static str> {
        self.month.map(|m| MONTH_NAMES_EN[(m - 1) as usize])
    }

    /// File stem for per-period data and output files: `2025-01` or `2025`.
    pub fn stem(&self) -> String {
        match self.month {
            Some(m) => format!("{}-{m:02}", self.year),
            None => self.year.to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The month a month-start key (`2025-03-01`, optionally with a time part)
/// falls in. `None` for anything that is not a `YYYY-MM-DD` date.
pub fn parse_month_key(key: &str) -> Option<Period> {
    let date = chrono::NaiveDate::parse_from_str(key.get(..10)?, "%Y-%m-%d").ok()?;
    Period::monthly(date.year(), date.month()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_months() {
        assert_eq!(Period::monthly(2025, 0), Err(PeriodError::MonthOutOfRange(0)));
        assert_eq!(Period::monthly(2025, 13), Err(PeriodError::MonthOutOfRange(13)));
        assert!(Period::monthly(2025, 12).is_ok());
    }

    #[test]
    fn derives_source_keys() {
        let p = Period::monthly(2025, 3).unwrap();
        assert_eq!(p.month_start_key(), "2025-03-01");
        assert_eq!(p.year_start_key(), "2025-01-01");
        assert_eq!(p.prev_year_start_key(), "2024-01-01");
        assert_eq!(p.month_label(), "Mar-25");
        assert_eq!(p.month_name_et(), Some("märts"));
        assert_eq!(p.stem(), "2025-03");
    }

    #[test]
    fn annual_period_has_no_month_name() {
        let p = Period::annual(2024);
        assert_eq!(p.month_name_et(), None);
        assert_eq!(p.stem(), "2024");
    }

    #[test]
    fn parses_month_start_keys() {
        assert_eq!(parse_month_key("2025-01-01"), Period::monthly(2025, 1).ok());
        let dec = parse_month_key("2024-12-01T00:00:00Z").unwrap();
        assert_eq!(dec.month_label(), "Dec-24");
        assert_eq!(parse_month_key("Jan-25"), None);
    }
}
