// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise store: fetch, log, delete, and aggregate per-day totals.

use chrono::{FixedOffset, NaiveDate};
use std::sync::{Arc, RwLock};

use crate::db::firestore::generate_document_id;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::exercise::{daily_calories_burned, daily_duration};
use crate::models::ExerciseEntry;
use crate::time_utils::local_day_bounds;

/// Exercise entry store for the signed-in user.
#[derive(Clone)]
pub struct ExerciseService {
    db: FirestoreDb,
    entries: Arc<RwLock<Vec<ExerciseEntry>>>,
    day_offset: FixedOffset,
}

impl ExerciseService {
    pub fn new(db: FirestoreDb, day_offset: FixedOffset) -> Self {
        Self {
            db,
            entries: Arc::new(RwLock::new(Vec::new())),
            day_offset,
        }
    }

    /// Fetch sessions for a user, optionally restricted to one calendar day,
    /// and replace the in-memory collection.
    pub async fn fetch_entries(
        &self,
        user_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<(), AppError> {
        let range = day.map(|day| local_day_bounds(day, self.day_offset));
        let fetched = self.db.list_exercises(user_id, range).await?;
        *self.entries.write().unwrap() = fetched;
        Ok(())
    }

    /// Log a new session and refetch that day's collection.
    pub async fn add_entry(&self, mut entry: ExerciseEntry) -> Result<String, AppError> {
        if entry.id.is_empty() {
            entry.id = generate_document_id();
        }

        self.db.set_exercise(&entry).await?;

        let day = entry.timestamp.with_timezone(&self.day_offset).date_naive();
        self.fetch_entries(&entry.user_id, Some(day)).await?;

        tracing::info!(entry_id = %entry.id, name = %entry.name, "Exercise logged");
        Ok(entry.id)
    }

    /// Delete a session and drop it from the in-memory collection.
    pub async fn delete_entry(&self, entry_id: &str) -> Result<(), AppError> {
        self.db.delete_exercise(entry_id).await?;
        self.entries
            .write()
            .unwrap()
            .retain(|entry| entry.id != entry_id);
        Ok(())
    }

    /// Snapshot of the current collection.
    pub fn entries(&self) -> Vec<ExerciseEntry> {
        self.entries.read().unwrap().clone()
    }

    // ─── Daily Aggregation ───────────────────────────────────────

    /// Total exercise minutes on `day`.
    pub fn total_duration(&self, day: NaiveDate) -> f64 {
        daily_duration(&self.entries.read().unwrap(), day, self.day_offset)
    }

    /// Total calories burned on `day`.
    pub fn total_calories_burned(&self, day: NaiveDate) -> f64 {
        daily_calories_burned(&self.entries.read().unwrap(), day, self.day_offset)
    }

    #[cfg(test)]
    pub(crate) fn install_entries(&self, entries: Vec<ExerciseEntry>) {
        *self.entries.write().unwrap() = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::offset_from_minutes;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_totals_over_installed_entries() {
        let service = ExerciseService::new(FirestoreDb::new_mock(), offset_from_minutes(0));
        service.install_entries(vec![ExerciseEntry {
            id: "e1".to_string(),
            user_id: "u1".to_string(),
            name: "Cycling".to_string(),
            duration_minutes: 45.0,
            calories_burned: 400.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        }]);

        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(service.total_duration(jan1), 45.0);
        assert_eq!(service.total_calories_burned(jan1), 400.0);

        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(service.total_duration(jan2), 0.0);
    }
}
