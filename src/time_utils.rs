// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting and calendar-day bucketing.
//!
//! Day boundaries are computed in an explicit fixed UTC offset (configured
//! via `DAY_OFFSET_MINUTES`) rather than by comparing local date fields, so
//! entries logged near midnight land in a well-defined day.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build a `FixedOffset` from minutes east of UTC, clamping to a valid range.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.clamp(-14 * 60, 14 * 60) * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// UTC bounds of a calendar day in the given offset, as a half-open range
/// `[start, end)`.
pub fn local_day_bounds(day: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_naive = day.and_time(NaiveTime::MIN) - offset;
    let end_naive = (day + chrono::Days::new(1)).and_time(NaiveTime::MIN) - offset;
    (
        DateTime::<Utc>::from_naive_utc_and_offset(start_naive, Utc),
        DateTime::<Utc>::from_naive_utc_and_offset(end_naive, Utc),
    )
}

/// Whether a UTC timestamp falls on the given calendar day in the given offset.
pub fn same_local_day(timestamp: DateTime<Utc>, day: NaiveDate, offset: FixedOffset) -> bool {
    timestamp.with_timezone(&offset).date_naive() == day
}
