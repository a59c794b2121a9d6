//! Working-day arithmetic for leave requests.
//!
//! The base counter walks the half-open range `[start, end)`. Everything built
//! on top of it (months, multi-month ranges, [`DateSpan`]) is inclusive on both
//! ends, and the conversion to the half-open form happens in one place.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::LeaveError;

/// Monday to Friday. Holidays are not considered.
pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts working days in `[start, end)`, one calendar day at a time.
///
/// The `end` day is never counted, so `start >= end` yields 0.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = start;

    while day < end {
        if is_working_day(day) {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    count
}

/// First and last day (both inclusive) of a 1-indexed calendar month.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate), LeaveError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| LeaveError::invalid(format!("invalid month {year}-{month}")))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let last = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| LeaveError::invalid(format!("month {year}-{month} out of range")))?;

    Ok((first, last))
}

/// Working days in a full calendar month, counting day 1 through the true last
/// day inclusive.
pub fn working_days_in_month(year: i32, month: u32) -> Result<u32, LeaveError> {
    let (first, last) = month_bounds(year, month)?;
    Ok(working_days_inclusive(first, last))
}

/// Working days in `[first, last]`, both ends counted.
pub fn working_days_inclusive(first: NaiveDate, last: NaiveDate) -> u32 {
    match last.succ_opt() {
        Some(end) => working_days_between(first, end),
        // last == NaiveDate::MAX
        None => working_days_between(first, last) + u32::from(first <= last && is_working_day(last)),
    }
}

/// Working days per calendar month over `[first, last]`.
///
/// Segments are produced in chronological order, each clipped to the range and
/// never overlapping.
pub fn monthly_segments(first: NaiveDate, last: NaiveDate) -> Vec<MonthSegment> {
    let mut segments = Vec::new();
    let mut cursor = first;

    while cursor <= last {
        let month_end = match month_bounds(cursor.year(), cursor.month()) {
            Ok((_, end)) => end,
            Err(_) => break,
        };
        let segment_end = month_end.min(last);

        segments.push(MonthSegment {
            year: cursor.year(),
            month: cursor.month(),
            start: cursor,
            end: segment_end,
            working_days: working_days_inclusive(cursor, segment_end),
        });

        match segment_end.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }

    segments
}

/// Sum of [`monthly_segments`] over `[first, last]`.
pub fn working_days_across_months(first: NaiveDate, last: NaiveDate) -> u32 {
    monthly_segments(first, last)
        .iter()
        .map(|segment| segment.working_days)
        .sum()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonthSegment {
    pub year: i32,
    pub month: u32,
    #[schema(value_type = String, format = "date")]
    pub start: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end: NaiveDate,
    pub working_days: u32,
}

/// A leave span whose first and last days are both taken off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LeaveError> {
        if start > end {
            return Err(LeaveError::invalid("start_date cannot be after end_date"));
        }
        Ok(Self { start, end })
    }

    /// Parses ISO 8601 calendar dates (`YYYY-MM-DD`) as received at the HTTP boundary.
    pub fn parse(start: &str, end: &str) -> Result<Self, LeaveError> {
        Self::new(parse_iso_date("start_date", start)?, parse_iso_date("end_date", end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn working_days(&self) -> u32 {
        working_days_inclusive(self.start, self.end)
    }
}

pub fn parse_iso_date(field: &str, value: &str) -> Result<NaiveDate, LeaveError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LeaveError::invalid(format!("{field} is required")));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        LeaveError::invalid(format!("{field} must be an ISO 8601 date (YYYY-MM-DD), got '{trimmed}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn same_day_counts_nothing() {
        let monday = d(2024, 1, 1);
        assert_eq!(working_days_between(monday, monday), 0);
    }

    #[test]
    fn reversed_range_counts_nothing() {
        assert_eq!(working_days_between(d(2024, 1, 10), d(2024, 1, 1)), 0);
    }

    #[test]
    fn end_day_is_excluded() {
        // Mon..Tue, Tuesday excluded
        assert_eq!(working_days_between(d(2024, 1, 1), d(2024, 1, 2)), 1);
    }

    // 2024-01-01 is a Monday; every start weekday is covered
    #[rstest]
    #[case(d(2024, 1, 1))]
    #[case(d(2024, 1, 2))]
    #[case(d(2024, 1, 3))]
    #[case(d(2024, 1, 4))]
    #[case(d(2024, 1, 5))]
    #[case(d(2024, 1, 6))]
    #[case(d(2024, 1, 7))]
    fn full_week_has_five_working_days(#[case] start: NaiveDate) {
        let end = start + Days::new(7);
        assert_eq!(working_days_between(start, end), 5);
    }

    #[test]
    fn weekend_only_span_is_zero() {
        assert_eq!(working_days_inclusive(d(2024, 1, 6), d(2024, 1, 7)), 0);
    }

    fn enumerate_month(year: i32, month: u32) -> u32 {
        (1..=31)
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .filter(|date| is_working_day(*date))
            .count() as u32
    }

    #[rstest]
    // January 2024: 31 days starting Monday, ends Wednesday
    #[case(2024, 1, 23)]
    // July 2024: 31 days starting Monday
    #[case(2024, 7, 23)]
    // February 2024: leap year
    #[case(2024, 2, 21)]
    // September 2024: ends on a Monday
    #[case(2024, 9, 21)]
    #[case(2023, 12, 21)]
    fn month_matches_day_by_day_enumeration(
        #[case] year: i32,
        #[case] month: u32,
        #[case] expected: u32,
    ) {
        let counted = working_days_in_month(year, month).unwrap();
        assert_eq!(counted, expected);
        assert_eq!(counted, enumerate_month(year, month));
    }

    #[test]
    fn month_counts_last_day() {
        // April 2024 ends on Tuesday the 30th
        let (_, last) = month_bounds(2024, 4).unwrap();
        assert_eq!(last, d(2024, 4, 30));
        assert!(is_working_day(last));
        assert_eq!(
            working_days_in_month(2024, 4).unwrap(),
            working_days_between(d(2024, 4, 1), last) + 1
        );
    }

    #[rstest]
    #[case(0)]
    #[case(13)]
    fn invalid_month_is_rejected(#[case] month: u32) {
        let err = working_days_in_month(2024, month).unwrap_err();
        assert_eq!(err.kind(), crate::leave::error::ErrorKind::Invalid);
    }

    #[test]
    fn segments_are_clipped_and_ordered() {
        let segments = monthly_segments(d(2024, 1, 29), d(2024, 3, 5));
        let months: Vec<_> = segments.iter().map(|s| (s.year, s.month)).collect();
        assert_eq!(months, vec![(2024, 1), (2024, 2), (2024, 3)]);
        assert_eq!(segments[0].start, d(2024, 1, 29));
        assert_eq!(segments[0].end, d(2024, 1, 31));
        assert_eq!(segments[1].start, d(2024, 2, 1));
        assert_eq!(segments[1].end, d(2024, 2, 29));
        assert_eq!(segments[2].end, d(2024, 3, 5));
        assert_eq!(segments[0].working_days, 3);
        assert_eq!(segments[2].working_days, 3);
    }

    #[test]
    fn segments_cross_year_boundary() {
        let segments = monthly_segments(d(2023, 12, 28), d(2024, 1, 2));
        assert_eq!(segments.len(), 2);
        assert_eq!((segments[1].year, segments[1].month), (2024, 1));
    }

    #[rstest]
    #[case(d(2024, 1, 29), d(2024, 3, 5))]
    #[case(d(2023, 11, 15), d(2024, 2, 10))]
    #[case(d(2024, 5, 4), d(2024, 5, 4))]
    #[case(d(2024, 6, 30), d(2024, 7, 1))]
    fn multi_month_sum_matches_direct_count(#[case] first: NaiveDate, #[case] last: NaiveDate) {
        assert_eq!(
            working_days_across_months(first, last),
            working_days_inclusive(first, last)
        );
    }

    #[test]
    fn empty_range_has_no_segments() {
        assert!(monthly_segments(d(2024, 2, 2), d(2024, 2, 1)).is_empty());
    }

    #[test]
    fn span_counts_both_ends() {
        // Monday through Friday
        let span = DateSpan::new(d(2024, 1, 1), d(2024, 1, 5)).unwrap();
        assert_eq!(span.working_days(), 5);
        let single = DateSpan::new(d(2024, 1, 3), d(2024, 1, 3)).unwrap();
        assert_eq!(single.working_days(), 1);
    }

    #[test]
    fn span_rejects_reversed_dates() {
        assert!(DateSpan::new(d(2024, 1, 5), d(2024, 1, 1)).is_err());
    }

    #[rstest]
    #[case("", "2024-01-02")]
    #[case("2024-01-01", "02/01/2024")]
    #[case("2024-13-01", "2024-01-02")]
    fn span_parse_rejects_malformed_dates(#[case] start: &str, #[case] end: &str) {
        let err = DateSpan::parse(start, end).unwrap_err();
        assert_eq!(err.kind(), crate::leave::error::ErrorKind::Invalid);
    }

    #[test]
    fn span_parse_accepts_iso_dates() {
        let span = DateSpan::parse("2024-01-01", " 2024-01-12 ").unwrap();
        assert_eq!(span.end(), d(2024, 1, 12));
        assert_eq!(span.working_days(), 10);
    }
}
