// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise entry model for storage and API.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::same_local_day;

/// A single logged exercise session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseEntry {
    /// Document ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Exercise name (e.g. "Running")
    pub name: String,
    /// Duration in minutes
    pub duration_minutes: f64,
    /// Estimated energy burned in kcal
    pub calories_burned: f64,
    /// When the session happened
    pub timestamp: DateTime<Utc>,
}

// ─── Daily Aggregation ───────────────────────────────────────────

/// Total exercise minutes on `day`.
pub fn daily_duration(entries: &[ExerciseEntry], day: NaiveDate, offset: FixedOffset) -> f64 {
    entries
        .iter()
        .filter(|entry| same_local_day(entry.timestamp, day, offset))
        .map(|entry| entry.duration_minutes)
        .sum()
}

/// Total calories burned on `day`.
pub fn daily_calories_burned(
    entries: &[ExerciseEntry],
    day: NaiveDate,
    offset: FixedOffset,
) -> f64 {
    entries
        .iter()
        .filter(|entry| same_local_day(entry.timestamp, day, offset))
        .map(|entry| entry.calories_burned)
        .sum()
}
