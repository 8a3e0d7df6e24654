// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal store: composed meals with item-level edits.
//!
//! Item mutations are optimistic: the in-memory meal is updated first and a
//! rollback is registered with the UI-state controller, so a failed write
//! (or any error transition) restores the previous items.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::sync::{Arc, RwLock};

use crate::db::firestore::generate_document_id;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{Meal, MealItem};
use crate::time_utils::local_day_bounds;
use crate::ui_state::UiStateController;

/// Meal store for the signed-in user.
#[derive(Clone)]
pub struct MealService {
    db: FirestoreDb,
    meals: Arc<RwLock<Vec<Meal>>>,
    day_offset: FixedOffset,
}

impl MealService {
    pub fn new(db: FirestoreDb, day_offset: FixedOffset) -> Self {
        Self {
            db,
            meals: Arc::new(RwLock::new(Vec::new())),
            day_offset,
        }
    }

    /// Fetch a day's meals and replace the in-memory collection.
    pub async fn fetch_for_date(&self, user_id: &str, day: NaiveDate) -> Result<(), AppError> {
        let range = local_day_bounds(day, self.day_offset);
        let fetched = self.db.list_meals(user_id, Some(range)).await?;
        *self.meals.write().unwrap() = fetched;
        Ok(())
    }

    /// Fetch today's meals (today in the configured day offset).
    pub async fn fetch_today(&self, user_id: &str) -> Result<(), AppError> {
        let today = Utc::now().with_timezone(&self.day_offset).date_naive();
        self.fetch_for_date(user_id, today).await
    }

    /// Snapshot of the current collection.
    pub fn meals(&self) -> Vec<Meal> {
        self.meals.read().unwrap().clone()
    }

    /// Create a meal. `total_calories` is derived from the items.
    ///
    /// Returns the new meal's ID.
    pub async fn add_meal(
        &self,
        user_id: &str,
        name: &str,
        time: &str,
        date: DateTime<Utc>,
        items: Vec<MealItem>,
    ) -> Result<String, AppError> {
        let meal = Meal {
            id: generate_document_id(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            time: time.to_string(),
            date,
            total_calories: Meal::item_calories(&items),
            items,
        };

        self.db.set_meal(&meal).await?;

        let meal_id = meal.id.clone();
        self.meals.write().unwrap().push(meal);

        tracing::info!(meal_id = %meal_id, name, "Meal created");
        Ok(meal_id)
    }

    /// Add an item to a meal, optimistically.
    pub async fn add_item(
        &self,
        ui: &UiStateController,
        meal_id: &str,
        mut item: MealItem,
    ) -> Result<(), AppError> {
        if item.id.is_empty() {
            item.id = generate_document_id();
        }

        let previous_items = self.mutate_items(meal_id, |items| items.push(item.clone()))?;
        self.persist_items(ui, meal_id, previous_items).await
    }

    /// Remove an item from a meal, optimistically.
    pub async fn remove_item(
        &self,
        ui: &UiStateController,
        meal_id: &str,
        item_id: &str,
    ) -> Result<(), AppError> {
        let previous_items =
            self.mutate_items(meal_id, |items| items.retain(|item| item.id != item_id))?;
        self.persist_items(ui, meal_id, previous_items).await
    }

    /// Delete a meal from the store, then drop it locally.
    pub async fn delete_meal(&self, meal_id: &str) -> Result<(), AppError> {
        self.db.delete_meal(meal_id).await?;
        self.meals.write().unwrap().retain(|meal| meal.id != meal_id);
        Ok(())
    }

    /// Apply an item mutation in memory, recomputing `total_calories`.
    ///
    /// Returns the pre-mutation items for rollback.
    fn mutate_items(
        &self,
        meal_id: &str,
        mutate: impl FnOnce(&mut Vec<MealItem>),
    ) -> Result<Vec<MealItem>, AppError> {
        let mut meals = self.meals.write().unwrap();
        let meal = meals
            .iter_mut()
            .find(|meal| meal.id == meal_id)
            .ok_or_else(|| AppError::NotFound(format!("Meal {}", meal_id)))?;

        let previous = meal.items.clone();
        mutate(&mut meal.items);
        meal.total_calories = Meal::item_calories(&meal.items);
        Ok(previous)
    }

    /// Write the mutated meal back, registering a rollback to the previous
    /// items for the duration of the write.
    async fn persist_items(
        &self,
        ui: &UiStateController,
        meal_id: &str,
        previous_items: Vec<MealItem>,
    ) -> Result<(), AppError> {
        let fallback_items = previous_items.clone();
        let rollback = {
            let meals = Arc::clone(&self.meals);
            let meal_id = meal_id.to_string();
            move || {
                let mut meals = meals.write().unwrap();
                if let Some(meal) = meals.iter_mut().find(|meal| meal.id == meal_id) {
                    meal.total_calories = Meal::item_calories(&previous_items);
                    meal.items = previous_items;
                }
            }
        };

        let update_id = ui.add_optimistic_update(
            serde_json::json!({ "meal_id": meal_id }),
            rollback,
        );

        let updated = self
            .meals
            .read()
            .unwrap()
            .iter()
            .find(|meal| meal.id == meal_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Meal {}", meal_id)))?;

        match self.db.set_meal(&updated).await {
            Ok(()) => {
                if let Some(id) = update_id {
                    ui.commit_optimistic_update(id);
                }
                Ok(())
            }
            Err(err) => {
                ui.set_error(
                    Some("Failed to update meal".to_string()),
                    Some(err.to_string()),
                );
                if update_id.is_none() {
                    // Ledger disabled: restore directly
                    let mut meals = self.meals.write().unwrap();
                    if let Some(meal) = meals.iter_mut().find(|meal| meal.id == meal_id) {
                        meal.total_calories = Meal::item_calories(&fallback_items);
                        meal.items = fallback_items;
                    }
                }
                Err(err)
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn install_meals(&self, meals: Vec<Meal>) {
        *self.meals.write().unwrap() = meals;
    }
}
