// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard aggregates behind the TTL cache.
//!
//! A summary combines the food and exercise day totals with the profile's
//! calorie target. Summaries are cached per user+day; entry writes must
//! invalidate the affected day.

use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::TtlCache;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::MacroTotals;
use crate::services::{ExerciseService, FoodService};

/// One day's combined nutrition/exercise numbers.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub calories_consumed: f64,
    pub macros: MacroTotals,
    pub calories_burned: f64,
    pub exercise_minutes: f64,
    /// consumed minus burned
    pub net_calories: f64,
    /// Profile's derived daily target, when onboarded
    pub daily_target: Option<f64>,
}

/// Cached dashboard aggregation service.
#[derive(Clone)]
pub struct DashboardService {
    db: FirestoreDb,
    food: FoodService,
    exercise: ExerciseService,
    cache: Arc<TtlCache<DailySummary>>,
}

impl DashboardService {
    pub fn new(
        db: FirestoreDb,
        food: FoodService,
        exercise: ExerciseService,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            db,
            food,
            exercise,
            cache: Arc::new(TtlCache::new(cache_ttl)),
        }
    }

    fn cache_key(user_id: &str, day: NaiveDate) -> String {
        format!("{}:{}", user_id, day)
    }

    /// Compute (or serve from cache) one day's summary.
    pub async fn daily_summary(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> Result<DailySummary, AppError> {
        let key = Self::cache_key(user_id, day);
        if let Some(summary) = self.cache.get(&key) {
            tracing::debug!(%key, "Dashboard summary served from cache");
            return Ok(summary);
        }

        self.food.fetch_entries(user_id, Some(day)).await?;
        self.exercise.fetch_entries(user_id, Some(day)).await?;

        let calories_consumed = self.food.total_calories(day);
        let macros = self.food.macro_totals(day);
        let calories_burned = self.exercise.total_calories_burned(day);
        let exercise_minutes = self.exercise.total_duration(day);

        let daily_target = self
            .db
            .get_user(user_id)
            .await?
            .and_then(|profile| profile.daily_calories);

        let summary = DailySummary {
            date: day,
            calories_consumed,
            macros,
            calories_burned,
            exercise_minutes,
            net_calories: calories_consumed - calories_burned,
            daily_target,
        };

        self.cache.set(key, summary.clone());
        Ok(summary)
    }

    /// Drop the cached summary for one user+day (called after writes).
    pub fn invalidate_day(&self, user_id: &str, day: NaiveDate) {
        self.cache.clear(Some(&Self::cache_key(user_id, day)));
    }

    /// Drop every cached summary (sign-out).
    pub fn invalidate_all(&self) {
        self.cache.clear(None);
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &TtlCache<DailySummary> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::offset_from_minutes;

    fn service() -> DashboardService {
        let db = FirestoreDb::new_mock();
        let offset = offset_from_minutes(0);
        DashboardService::new(
            db.clone(),
            FoodService::new(db.clone(), offset),
            ExerciseService::new(db, offset),
            Duration::from_millis(300_000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_summary_skips_backend() {
        let dashboard = service();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        // Seed the cache directly; the offline store would reject a fetch
        dashboard.cache().set(
            DashboardService::cache_key("u1", day),
            DailySummary {
                date: day,
                calories_consumed: 1800.0,
                macros: MacroTotals::default(),
                calories_burned: 300.0,
                exercise_minutes: 30.0,
                net_calories: 1500.0,
                daily_target: Some(2200.0),
            },
        );

        let summary = dashboard.daily_summary("u1", day).await.unwrap();
        assert_eq!(summary.calories_consumed, 1800.0);
        assert_eq!(summary.net_calories, 1500.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_forces_recompute() {
        let dashboard = service();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        dashboard.cache().set(
            DashboardService::cache_key("u1", day),
            DailySummary {
                date: day,
                calories_consumed: 1800.0,
                macros: MacroTotals::default(),
                calories_burned: 0.0,
                exercise_minutes: 0.0,
                net_calories: 1800.0,
                daily_target: None,
            },
        );

        dashboard.invalidate_day("u1", day);

        // Recompute hits the offline store and fails
        let result = dashboard.daily_summary("u1", day).await;
        assert!(result.is_err());
    }
}
