//! Retention ages encoded in label names.
//!
//! A label such as `TTL: 2 months` carries an [`Age`] in its suffix. The age
//! is parsed from free text and resolved against a reference instant into the
//! cutoff before which a thread counts as expired.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a unit word is not one of the four known units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown age unit: {0}")]
pub struct ParseAgeUnitError(pub String);

/// Calendar unit of an [`Age`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeUnit {
    /// 24 hours.
    Day,
    /// 7 days.
    Week,
    /// One step of the month field.
    Month,
    /// One step of the year field.
    Year,
}

impl AgeUnit {
    /// Returns the singular unit word.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeUnit::Day => "day",
            AgeUnit::Week => "week",
            AgeUnit::Month => "month",
            AgeUnit::Year => "year",
        }
    }
}

impl FromStr for AgeUnit {
    type Err = ParseAgeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(AgeUnit::Day),
            "week" => Ok(AgeUnit::Week),
            "month" => Ok(AgeUnit::Month),
            "year" => Ok(AgeUnit::Year),
            _ => Err(ParseAgeUnitError(s.to_string())),
        }
    }
}

impl fmt::Display for AgeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An age such as "30 days" or "2 years".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Age {
    /// Number of units. Zero is valid and resolves to the reference instant.
    pub count: u64,
    /// Unit of the count.
    pub unit: AgeUnit,
}

fn age_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]+)\s?(?i-u:(day|week|month|year)s?)").expect("age pattern is valid")
    })
}

impl Age {
    /// Creates an age from a count and unit.
    pub fn new(count: u64, unit: AgeUnit) -> Self {
        Self { count, unit }
    }

    /// Finds the first `<digits>[whitespace]<unit>[s]` occurrence in `text`.
    ///
    /// The match is unanchored and everything around it is ignored. Unit
    /// words fold ASCII case only. Returns `None` when there is no match.
    /// A count too large for `u64` saturates; its cutoff lies before any
    /// representable instant.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = age_pattern().captures(text)?;
        // A non-empty digit run only fails to parse on overflow.
        let count = captures[1].parse::<u64>().unwrap_or(u64::MAX);
        let unit = captures[2].parse::<AgeUnit>().ok()?;
        Some(Self { count, unit })
    }

    /// Resolves this age against `now` into a cutoff instant.
    ///
    /// Days and weeks subtract exact multiples of 24 hours. Months and years
    /// shift the calendar fields, keeping day-of-month and time-of-day; a
    /// day-of-month missing from the target month rolls forward into the next
    /// month (March 31 minus one month is March 3, or March 2 in a leap year).
    /// Cutoffs beyond the representable range saturate at the earliest
    /// representable instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.count)
            .ok()
            .and_then(|count| match self.unit {
                AgeUnit::Day => days_before(now, count),
                AgeUnit::Week => days_before(now, count.checked_mul(7)?),
                AgeUnit::Month => months_before(now, count),
                AgeUnit::Year => years_before(now, count),
            })
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Resolves this age against the current wall-clock time.
    pub fn cutoff_from_now(&self) -> DateTime<Utc> {
        self.cutoff(Utc::now())
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.count == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.count, self.unit, plural)
    }
}

fn days_before(now: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::try_days(days)?)
}

fn months_before(now: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let total = (i64::from(now.year()) * 12 + i64::from(now.month0())).checked_sub(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    with_rolled_date(now, year, month)
}

fn years_before(now: DateTime<Utc>, years: i64) -> Option<DateTime<Utc>> {
    let year = i32::try_from(i64::from(now.year()).checked_sub(years)?).ok()?;
    with_rolled_date(now, year, now.month())
}

/// Moves `now` into `year`/`month`, carrying surplus days into the next month.
fn with_rolled_date(now: DateTime<Utc>, year: i32, month: u32) -> Option<DateTime<Utc>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first.checked_add_days(Days::new(u64::from(now.day0())))?;
    Some(date.and_time(now.time()).and_utc())
}
