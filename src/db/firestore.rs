// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Food entries (individual logged foods)
//! - Exercises (logged sessions)
//! - Meals (composed meals with items)

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ExerciseEntry, FoodEntry, Meal, UserProfile};
use crate::time_utils::format_utc_rfc3339;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

static DOC_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-unique document ID (timestamp plus sequence).
pub fn generate_document_id() -> String {
    let seq = DOC_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:04x}", Utc::now().timestamp_micros(), seq & 0xffff)
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by auth provider user ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user profile.
    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Food Entry Operations ───────────────────────────────────

    /// List food entries for a user, newest first, optionally restricted to a
    /// UTC timestamp range (half-open).
    pub async fn list_food_entries(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<FoodEntry>, AppError> {
        self.list_for_user(collections::FOOD_ENTRIES, user_id, "timestamp", range)
            .await
    }

    /// Store a food entry.
    pub async fn set_food_entry(&self, entry: &FoodEntry) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FOOD_ENTRIES)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a food entry.
    pub async fn delete_food_entry(&self, entry_id: &str) -> Result<(), AppError> {
        self.delete_document(collections::FOOD_ENTRIES, entry_id)
            .await
    }

    // ─── Exercise Operations ─────────────────────────────────────

    /// List exercise entries for a user, newest first, optionally restricted
    /// to a UTC timestamp range (half-open).
    pub async fn list_exercises(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<ExerciseEntry>, AppError> {
        self.list_for_user(collections::EXERCISES, user_id, "timestamp", range)
            .await
    }

    /// Store an exercise entry.
    pub async fn set_exercise(&self, entry: &ExerciseEntry) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::EXERCISES)
            .document_id(&entry.id)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete an exercise entry.
    pub async fn delete_exercise(&self, entry_id: &str) -> Result<(), AppError> {
        self.delete_document(collections::EXERCISES, entry_id).await
    }

    // ─── Meal Operations ─────────────────────────────────────────

    /// List meals for a user, optionally restricted to a UTC date range.
    pub async fn list_meals(
        &self,
        user_id: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<Meal>, AppError> {
        self.list_for_user(collections::MEALS, user_id, "date", range)
            .await
    }

    /// Store a meal document (used for both insert and item updates).
    pub async fn set_meal(&self, meal: &Meal) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MEALS)
            .document_id(&meal.id)
            .object(meal)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a meal.
    pub async fn delete_meal(&self, meal_id: &str) -> Result<(), AppError> {
        self.delete_document(collections::MEALS, meal_id).await
    }

    // ─── Generic Helpers ─────────────────────────────────────────

    /// Query a collection for one user's documents, newest first by
    /// `date_field`, with an optional half-open timestamp range.
    async fn list_for_user<T>(
        &self,
        collection: &str,
        user_id: &str,
        date_field: &str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        let query = self.get_client()?.fluent().select().from(collection);

        let user_id = user_id.to_string();
        let date_field_owned = date_field.to_string();
        let query = match range {
            Some((start, end)) => {
                let start = format_utc_rfc3339(start);
                let end = format_utc_rfc3339(end);
                query.filter(move |q| {
                    q.for_all([
                        q.field("user_id").eq(user_id.clone()),
                        q.field(date_field_owned.clone())
                            .greater_than_or_equal(start.clone()),
                        q.field(date_field_owned.clone()).less_than(end.clone()),
                    ])
                })
            }
            None => query.filter(move |q| q.field("user_id").eq(user_id.clone())),
        };

        query
            .order_by([(date_field, firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn delete_document(&self, collection: &str, doc_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(doc_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Store multiple food entries concurrently (seed/import path).
    ///
    /// Uses concurrent writes with a limit to avoid overloading Firestore.
    pub async fn batch_set_food_entries(&self, entries: &[FoodEntry]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(entries.to_vec())
            .map(|entry| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::FOOD_ENTRIES)
                    .document_id(&entry.id)
                    .object(&entry)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    // ─── User Data Deletion ──────────────────────────────────────

    /// Delete ALL data for a user (account deletion).
    ///
    /// Deletes from all collections:
    /// - `food_entries` (query by user_id)
    /// - `exercises` (query by user_id)
    /// - `meals` (query by user_id)
    /// - `users/{user_id}`
    ///
    /// Returns the number of documents deleted.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<usize, AppError> {
        let mut deleted_count = 0;

        let food_entries: Vec<FoodEntry> = self.list_food_entries(user_id, None).await?;
        let count = food_entries.len();
        self.batch_delete(&food_entries, collections::FOOD_ENTRIES, |entry| {
            entry.id.clone()
        })
        .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted food entries");

        let exercises: Vec<ExerciseEntry> = self.list_exercises(user_id, None).await?;
        let count = exercises.len();
        self.batch_delete(&exercises, collections::EXERCISES, |entry| entry.id.clone())
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted exercises");

        let meals: Vec<Meal> = self.list_meals(user_id, None).await?;
        let count = meals.len();
        self.batch_delete(&meals, collections::MEALS, |meal| meal.id.clone())
            .await?;
        deleted_count += count;
        tracing::debug!(user_id, count, "Deleted meals");

        self.delete_document(collections::USERS, user_id).await?;
        deleted_count += 1;
        tracing::debug!(user_id, "Deleted user profile");

        tracing::info!(user_id, deleted_count, "User data deletion complete");

        Ok(deleted_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_document_id();
        let b = generate_document_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_offline_mock_rejects_operations() {
        let db = FirestoreDb::new_mock();
        let result = db.get_user("u1").await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
