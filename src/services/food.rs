// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food entry store: fetch, log, delete, and aggregate per-day totals.
//!
//! Holds the in-memory entry collection last fetched from Firestore. The
//! collection is replaced wholesale on each fetch; aggregation reads whatever
//! was fetched last. Callers serialize logically-related writes by awaiting
//! each step (add-then-refetch).

use chrono::{FixedOffset, NaiveDate};
use std::sync::{Arc, RwLock};

use crate::db::firestore::generate_document_id;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::food::{daily_calories, daily_macros};
use crate::models::{FoodEntry, MacroTotals};
use crate::time_utils::local_day_bounds;

/// Food entry store for the signed-in user.
#[derive(Clone)]
pub struct FoodService {
    db: FirestoreDb,
    entries: Arc<RwLock<Vec<FoodEntry>>>,
    day_offset: FixedOffset,
}

impl FoodService {
    pub fn new(db: FirestoreDb, day_offset: FixedOffset) -> Self {
        Self {
            db,
            entries: Arc::new(RwLock::new(Vec::new())),
            day_offset,
        }
    }

    /// Fetch entries for a user, optionally restricted to one calendar day,
    /// and replace the in-memory collection.
    pub async fn fetch_entries(
        &self,
        user_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<(), AppError> {
        let range = day.map(|day| local_day_bounds(day, self.day_offset));
        let fetched = self.db.list_food_entries(user_id, range).await?;
        *self.entries.write().unwrap() = fetched;
        Ok(())
    }

    /// Log a new food entry and refetch that day's collection.
    ///
    /// Returns the new entry's ID.
    pub async fn add_entry(&self, mut entry: FoodEntry) -> Result<String, AppError> {
        if entry.id.is_empty() {
            entry.id = generate_document_id();
        }

        self.db.set_food_entry(&entry).await?;

        let day = entry.timestamp.with_timezone(&self.day_offset).date_naive();
        self.fetch_entries(&entry.user_id, Some(day)).await?;

        tracing::info!(entry_id = %entry.id, name = %entry.name, "Food entry logged");
        Ok(entry.id)
    }

    /// Delete an entry and drop it from the in-memory collection.
    pub async fn delete_entry(&self, entry_id: &str) -> Result<(), AppError> {
        self.db.delete_food_entry(entry_id).await?;
        self.entries
            .write()
            .unwrap()
            .retain(|entry| entry.id != entry_id);
        Ok(())
    }

    /// Snapshot of the current collection.
    pub fn entries(&self) -> Vec<FoodEntry> {
        self.entries.read().unwrap().clone()
    }

    // ─── Daily Aggregation ───────────────────────────────────────

    /// Total calories logged on `day`.
    pub fn total_calories(&self, day: NaiveDate) -> f64 {
        daily_calories(&self.entries.read().unwrap(), day, self.day_offset)
    }

    /// Macro totals for `day`; absent fields count as zero.
    pub fn macro_totals(&self, day: NaiveDate) -> MacroTotals {
        daily_macros(&self.entries.read().unwrap(), day, self.day_offset)
    }

    // ─── Search Support ──────────────────────────────────────────

    /// Case-folded name-prefix matches from the in-memory collection.
    pub fn prefix_matches(&self, query: &str, limit: usize) -> Vec<FoodEntry> {
        let needle = query.to_lowercase();
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|entry| entry.name.to_lowercase().starts_with(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Replace the in-memory collection directly (test seeding).
    #[cfg(test)]
    pub(crate) fn install_entries(&self, entries: Vec<FoodEntry>) {
        *self.entries.write().unwrap() = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::offset_from_minutes;
    use chrono::{TimeZone, Utc};

    fn service_with(entries: Vec<FoodEntry>) -> FoodService {
        let service = FoodService::new(FirestoreDb::new_mock(), offset_from_minutes(0));
        service.install_entries(entries);
        service
    }

    fn entry(id: &str, name: &str, calories: f64, day: u32) -> FoodEntry {
        FoodEntry {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: name.to_string(),
            calories,
            protein: Some(10.0),
            carbs: None,
            fat: Some(3.0),
            image_url: None,
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_total_calories_per_day() {
        let service = service_with(vec![
            entry("a", "Rice", 500.0, 1),
            entry("b", "Beans", 300.0, 2),
        ]);

        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let jan3 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        assert_eq!(service.total_calories(jan1), 500.0);
        assert_eq!(service.total_calories(jan3), 0.0);
    }

    #[test]
    fn test_macro_totals_no_nan() {
        let service = service_with(vec![entry("a", "Rice", 500.0, 1)]);
        let totals = service.macro_totals(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(totals.protein, 10.0);
        assert_eq!(totals.carbs, 0.0);
        assert!(!totals.carbs.is_nan());
    }

    #[test]
    fn test_prefix_matches_case_folded_and_capped() {
        let service = service_with(vec![
            entry("a", "Apple", 52.0, 1),
            entry("b", "apple pie", 300.0, 1),
            entry("c", "Banana", 89.0, 1),
            entry("d", "APPLE JUICE", 110.0, 1),
        ]);

        let matches = service.prefix_matches("ap", 5);
        assert_eq!(matches.len(), 3);

        let capped = service.prefix_matches("ap", 2);
        assert_eq!(capped.len(), 2);

        assert!(service.prefix_matches("pple", 5).is_empty());
    }

    #[tokio::test]
    async fn test_delete_entry_fails_offline_and_keeps_collection() {
        let service = service_with(vec![entry("a", "Rice", 500.0, 1)]);
        let result = service.delete_entry("a").await;
        assert!(result.is_err());
        assert_eq!(service.entries().len(), 1);
    }
}
