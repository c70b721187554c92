//! Quarter calendar - pure date arithmetic over fiscal quarters
//!
//! A quarter is a 3-month period (Q1 Jan-Mar ... Q4 Oct-Dec). Every partition
//! sheet is keyed by [`QuarterId::sheet_name`], and no other naming scheme
//! exists anywhere in the workspace.

use super::error::{DomainError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quarter identifier, totally ordered by (year, quarter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawQuarterId")]
pub struct QuarterId {
    // Field order drives the derived Ord: year first, then quarter
    year: i32,
    quarter: u32,
}

#[derive(Deserialize)]
struct RawQuarterId {
    year: i32,
    quarter: u32,
}

impl TryFrom<RawQuarterId> for QuarterId {
    type Error = DomainError;

    fn try_from(raw: RawQuarterId) -> Result<Self> {
        QuarterId::new(raw.quarter, raw.year)
    }
}

impl QuarterId {
    /// Create a quarter id, rejecting quarters outside 1-4
    pub fn new(quarter: u32, year: i32) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(DomainError::InvalidQuarter(quarter));
        }
        Ok(Self { year, quarter })
    }

    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Quarter containing `now`: quarter = ceil(month / 3)
    pub fn current(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            quarter: (now.month() + 2) / 3,
        }
    }

    /// Following quarter; Q4 wraps to Q1 of the next year
    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// First calendar day of this quarter
    ///
    /// Saturates at `NaiveDate::MAX` for years outside chrono's range.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, (self.quarter - 1) * 3 + 1, 1).unwrap_or(NaiveDate::MAX)
    }

    /// Whole days from `now`'s date to the first day of the following quarter
    ///
    /// Zero on the boundary date itself. Negative when this quarter already
    /// lies in the past, so callers pass the current quarter.
    pub fn days_until_boundary(&self, now: DateTime<Utc>) -> i64 {
        self.next()
            .first_day()
            .signed_duration_since(now.date_naive())
            .num_days()
    }

    /// Deterministic partition sheet name, e.g. `Q4-2025`
    pub fn sheet_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for QuarterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}-{}", self.quarter, self.year)
    }
}

impl FromStr for QuarterId {
    type Err = DomainError;

    /// Parse a sheet name produced by [`QuarterId::sheet_name`]
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DomainError::InvalidSheetName(s.to_string());

        let rest = s.strip_prefix('Q').ok_or_else(invalid)?;
        let (quarter, year) = rest.split_once('-').ok_or_else(invalid)?;
        if quarter.len() != 1 || year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let quarter: u32 = quarter.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        QuarterId::new(quarter, year).map_err(|_| invalid())
    }
}
