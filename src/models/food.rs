// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Food entry and meal models for storage and API.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::same_local_day;

/// A single logged food record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodEntry {
    /// Document ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Food name as logged
    pub name: String,
    /// Energy in kcal
    pub calories: f64,
    /// Protein grams (absent on sparsely-logged entries)
    #[serde(default)]
    pub protein: Option<f64>,
    /// Carbohydrate grams
    #[serde(default)]
    pub carbs: Option<f64>,
    /// Fat grams
    #[serde(default)]
    pub fat: Option<f64>,
    /// Optional photo URL
    #[serde(default)]
    pub image_url: Option<String>,
    /// When the food was eaten
    pub timestamp: DateTime<Utc>,
}

/// Per-day macro nutrient sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroTotals {
    /// Fold one entry into the totals; absent fields count as zero.
    pub fn accumulate(&mut self, entry: &FoodEntry) {
        self.protein += entry.protein.unwrap_or(0.0);
        self.carbs += entry.carbs.unwrap_or(0.0);
        self.fat += entry.fat.unwrap_or(0.0);
    }
}

/// A food item inside a composed meal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    pub id: String,
    pub name: String,
    pub calories: f64,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
}

/// A named meal (breakfast, lunch, ...) composed of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    /// Document ID
    pub id: String,
    /// Owning user ID
    pub user_id: String,
    /// Meal name (e.g. "Breakfast")
    pub name: String,
    /// Display time, "HH:MM"
    pub time: String,
    /// When the meal was eaten
    pub date: DateTime<Utc>,
    pub items: Vec<MealItem>,
    /// Sum of item calories, recomputed on every item mutation
    pub total_calories: f64,
}

impl Meal {
    /// Sum of item calories.
    pub fn item_calories(items: &[MealItem]) -> f64 {
        items.iter().map(|item| item.calories).sum()
    }
}

// ─── Daily Aggregation ───────────────────────────────────────────

/// Total calories logged on `day`. Entries sharing a timestamp all count.
pub fn daily_calories(entries: &[FoodEntry], day: NaiveDate, offset: FixedOffset) -> f64 {
    entries
        .iter()
        .filter(|entry| same_local_day(entry.timestamp, day, offset))
        .map(|entry| entry.calories)
        .sum()
}

/// Macro totals for `day`; absent macro fields count as zero.
pub fn daily_macros(entries: &[FoodEntry], day: NaiveDate, offset: FixedOffset) -> MacroTotals {
    entries
        .iter()
        .filter(|entry| same_local_day(entry.timestamp, day, offset))
        .fold(MacroTotals::default(), |mut totals, entry| {
            totals.accumulate(entry);
            totals
        })
}
