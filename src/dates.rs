use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use regex::Regex;

use crate::error::{ReflectError, Result};

/// Longest span, in calendar months, a report may cover.
pub const MAX_DATE_RANGE_MONTHS: u32 = 36;

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date pattern"));

/// How the user asked for the reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateMode {
    /// The last N months up to now.
    Lookback(i64),
    /// From a fixed `YYYY-MM-DD` date up to now.
    Since(String),
    /// An explicit, inclusive `YYYY-MM-DD` pair.
    Range { start: String, end: String },
}

/// Resolved reporting window. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateMode {
    /// Picks the single date mode selected by the command-line flags.
    ///
    /// `--start-date` and `--end-date` form one group and must be given
    /// together.
    pub fn from_flags(
        lookback: Option<i64>,
        since: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self> {
        let has_range = start_date.is_some() || end_date.is_some();
        let mode_count = [lookback.is_some(), since.is_some(), has_range]
            .into_iter()
            .filter(|present| *present)
            .count();

        if mode_count > 1 {
            return Err(ReflectError::InvalidDateMode(
                "Cannot combine --lookback, --since, and --start-date/--end-date",
            ));
        }

        match (lookback, since, start_date, end_date) {
            (Some(months), None, None, None) => Ok(DateMode::Lookback(months)),
            (None, Some(since), None, None) => Ok(DateMode::Since(since.to_string())),
            (None, None, Some(start), Some(end)) => Ok(DateMode::Range {
                start: start.to_string(),
                end: end.to_string(),
            }),
            (None, None, Some(_), None) | (None, None, None, Some(_)) => {
                Err(ReflectError::InvalidDateMode(
                    "Both --start-date and --end-date are required when using date range",
                ))
            }
            _ => Err(ReflectError::InvalidDateMode(
                "Must specify either --lookback, --since, or both --start-date and --end-date",
            )),
        }
    }

    /// Turns the mode into concrete dates relative to `now`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<DateRange> {
        match self {
            DateMode::Lookback(months) => resolve_lookback(*months, now),
            DateMode::Since(since) => resolve_since(since, now),
            DateMode::Range { start, end } => resolve_range(start, end),
        }
    }
}

fn resolve_lookback(months: i64, now: DateTime<Utc>) -> Result<DateRange> {
    let invalid = || ReflectError::InvalidLookback {
        value: months,
        max: MAX_DATE_RANGE_MONTHS,
    };

    if !(1..=i64::from(MAX_DATE_RANGE_MONTHS)).contains(&months) {
        return Err(invalid());
    }

    let start = shift_months(now, -months).ok_or_else(invalid)?;
    Ok(DateRange { start, end: now })
}

fn resolve_since(since: &str, now: DateTime<Utc>) -> Result<DateRange> {
    let start = parse_date(since).ok_or_else(|| ReflectError::InvalidDateFormat {
        field: "since",
        value: since.to_string(),
    })?;

    if start > now {
        return Err(ReflectError::DateInFuture);
    }

    if !is_within_limit(start, now, MAX_DATE_RANGE_MONTHS) {
        return Err(ReflectError::DateRangeExceeded(format!(
            "Since date cannot be more than {MAX_DATE_RANGE_MONTHS} months ago"
        )));
    }

    Ok(DateRange { start, end: now })
}

fn resolve_range(start: &str, end: &str) -> Result<DateRange> {
    let parsed_start = parse_date(start).ok_or_else(|| ReflectError::InvalidDateFormat {
        field: "start",
        value: start.to_string(),
    })?;
    let parsed_end = parse_date(end).ok_or_else(|| ReflectError::InvalidDateFormat {
        field: "end",
        value: end.to_string(),
    })?;

    DateRange::new(parsed_start, parsed_end)
}

impl DateRange {
    /// Builds a range from two instants, enforcing ordering and the span
    /// ceiling.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(ReflectError::StartAfterEnd);
        }

        if !is_within_limit(start, end, MAX_DATE_RANGE_MONTHS) {
            return Err(ReflectError::DateRangeExceeded(format!(
                "Date range cannot exceed {MAX_DATE_RANGE_MONTHS} months"
            )));
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Renders the range as GitHub search syntax, e.g. `2025-01-01..2025-06-01`.
    pub fn github_range(&self) -> String {
        format_date_range_for_github(self.start, self.end)
    }
}

pub fn format_date_range_for_github(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!("{}..{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

/// Long-form date used in prose, e.g. `January 5, 2025`.
pub fn format_date_for_display(date: DateTime<Utc>) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Checks the strict `YYYY-MM-DD` shape and that the date exists on the
/// calendar.
pub fn is_valid_date_format(value: &str) -> bool {
    parse_date(value).is_some()
}

/// Parses a strict `YYYY-MM-DD` string into UTC midnight of that day.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if !DATE_FORMAT.is_match(value) {
        return None;
    }

    let mut parts = value.split('-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    if date.year() != year || date.month() != month || date.day() != day {
        return None;
    }

    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// True when `end` is no later than `start` plus `max_months` calendar
/// months. The boundary itself is allowed.
pub fn is_within_limit(start: DateTime<Utc>, end: DateTime<Utc>, max_months: u32) -> bool {
    shift_months(start, i64::from(max_months)).is_some_and(|limit| end <= limit)
}

/// Moves `instant` by whole calendar months, keeping the day of month and
/// time of day. A day past the end of the target month rolls forward into
/// the next month, so one month before March 30th of a leap year is
/// March 1st.
pub fn shift_months(instant: DateTime<Utc>, months: i64) -> Option<DateTime<Utc>> {
    let total = i64::from(instant.year()) * 12 + i64::from(instant.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;

    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first_of_month.checked_add_days(Days::new(u64::from(instant.day0())))?;

    Some(date.and_time(instant.time()).and_utc())
}
