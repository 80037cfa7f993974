//! The dekad calendar.
//!
//! A dekad is a 10-day period. Each month holds exactly three of them
//! (days 1-10, 11-20 and 21 to month end), so a year always has 36 and
//! leap days are absorbed by the third dekad of February.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AaError, AaResult};

/// Number of dekads in a calendar year.
pub const DEKADS_PER_YEAR: u8 = 36;

/// A (year, dekad-of-year) pair, ordered by year then dekad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "DekadRepr")]
pub struct Dekad {
    year: i32,
    dekad: u8,
}

#[derive(Deserialize)]
struct DekadRepr {
    year: i32,
    dekad: u8,
}

impl TryFrom<DekadRepr> for Dekad {
    type Error = AaError;

    fn try_from(repr: DekadRepr) -> AaResult<Self> {
        Dekad::new(repr.year, repr.dekad)
    }
}

impl Dekad {
    /// Create a dekad, rejecting dekad-of-year values outside 1..=36.
    pub fn new(year: i32, dekad: u8) -> AaResult<Self> {
        if !(1..=DEKADS_PER_YEAR).contains(&dekad) {
            return Err(AaError::invalid_period(format!(
                "dekad {} of year {} is outside 1..={}",
                dekad, year, DEKADS_PER_YEAR
            )));
        }
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none() {
            return Err(AaError::invalid_period(format!(
                "year {} is not representable",
                year
            )));
        }
        Ok(Self { year, dekad })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn dekad(&self) -> u8 {
        self.dekad
    }

    /// The dekad containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        let third = ((date.day() - 1) / 10).min(2) as u8;
        Self {
            year: date.year(),
            dekad: (date.month() as u8 - 1) * 3 + third + 1,
        }
    }

    /// First day of the dekad.
    pub fn to_date(&self) -> NaiveDate {
        let month = (self.dekad as u32 - 1) / 3 + 1;
        let day = ((self.dekad as u32 - 1) % 3) * 10 + 1;
        // Years are range-checked in `new`, and day 21 exists in every month.
        NaiveDate::from_ymd_opt(self.year, month, day).unwrap_or(NaiveDate::MIN)
    }

    /// The dekad containing today's UTC date.
    pub fn today() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    /// Resolve an optional flexible input, falling back to `default`.
    pub fn from_input(value: Option<DekadInput>, default: DekadInput) -> AaResult<Self> {
        value.unwrap_or(default).resolve()
    }

    /// Absolute dekad count, used for range arithmetic.
    pub fn ordinal(&self) -> i64 {
        self.year as i64 * DEKADS_PER_YEAR as i64 + (self.dekad as i64 - 1)
    }

    /// Inverse of [`Dekad::ordinal`].
    pub fn from_ordinal(ordinal: i64) -> AaResult<Self> {
        let per_year = DEKADS_PER_YEAR as i64;
        let year = i32::try_from(ordinal.div_euclid(per_year))
            .map_err(|_| AaError::invalid_period(format!("ordinal {} out of range", ordinal)))?;
        Self::new(year, (ordinal.rem_euclid(per_year) + 1) as u8)
    }

    /// The following dekad, wrapping into the next year after dekad 36.
    pub fn succ(&self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1).ok()
    }

    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

impl fmt::Display for Dekad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-d{:02}", self.year, self.dekad)
    }
}

impl FromStr for Dekad {
    type Err = AaError;

    /// Accepts `YYYY,NN`, `YYYY-dNN` or an ISO `YYYY-MM-DD` date.
    fn from_str(s: &str) -> AaResult<Self> {
        let s = s.trim();
        if let Some((year, dekad)) = s.split_once("-d") {
            return parse_pair(year, dekad, s);
        }
        s.parse::<DekadInput>()?.resolve()
    }
}

fn parse_pair(year: &str, dekad: &str, original: &str) -> AaResult<Dekad> {
    let invalid = || AaError::invalid_period(format!("cannot parse '{}' as a dekad", original));
    let year = year.trim().parse::<i32>().map_err(|_| invalid())?;
    let dekad = dekad.trim().parse::<u8>().map_err(|_| invalid())?;
    Dekad::new(year, dekad)
}

/// The forms a caller may use to name a dekad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DekadInput {
    Date(NaiveDate),
    /// ISO 8601 calendar date, parsed on resolution.
    Iso(String),
    Pair(i32, u8),
}

impl DekadInput {
    pub fn resolve(self) -> AaResult<Dekad> {
        match self {
            DekadInput::Date(date) => Ok(Dekad::from_date(date)),
            DekadInput::Iso(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Dekad::from_date)
                .map_err(|e| AaError::invalid_period(format!("invalid date '{}': {}", s, e))),
            DekadInput::Pair(year, dekad) => Dekad::new(year, dekad),
        }
    }
}

impl From<NaiveDate> for DekadInput {
    fn from(date: NaiveDate) -> Self {
        DekadInput::Date(date)
    }
}

impl From<(i32, u8)> for DekadInput {
    fn from((year, dekad): (i32, u8)) -> Self {
        DekadInput::Pair(year, dekad)
    }
}

impl From<Dekad> for DekadInput {
    fn from(d: Dekad) -> Self {
        DekadInput::Pair(d.year, d.dekad)
    }
}

impl FromStr for DekadInput {
    type Err = AaError;

    fn from_str(s: &str) -> AaResult<Self> {
        let s = s.trim();
        match s.split_once(',') {
            Some((year, dekad)) => {
                let d = parse_pair(year, dekad, s)?;
                Ok(DekadInput::Pair(d.year, d.dekad))
            }
            None => Ok(DekadInput::Iso(s.to_string())),
        }
    }
}
