//! Calendar dates in the compact `YYYYMMDD` form used by compose names.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Local, NaiveDate};

use crate::{Error, Result};

/// `strftime` pattern of a [`DateStamp`].
pub const DATE_FORMAT: &str = "%Y%m%d";

/// A calendar date rendered as eight digits, e.g. `20240101`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateStamp(NaiveDate);

impl DateStamp {
    /// Today's date in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// The date `days_back` days before this one.
    ///
    /// Returns `None` only when the result would fall outside the range
    /// `chrono` can represent.
    pub fn shift(self, days_back: u32) -> Option<Self> {
        self.0
            .checked_sub_days(Days::new(u64::from(days_back)))
            .map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for DateStamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Config(format!(
                "date stamp must be eight digits (YYYYMMDD), got '{}'",
                s
            )));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|e| Error::Config(format!("invalid date stamp '{}': {}", s, e)))
    }
}
