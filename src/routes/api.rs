// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityLevel, ExerciseEntry, FoodEntry, Gender, GoalType, Meal, MealItem, UserProfile};
use crate::services::{DailySummary, NutritionEstimate, SearchResults};
use crate::ui_state::{UiState, UiStateData};
use crate::AppState;

/// Default chunk size for batch imports.
const IMPORT_BATCH_SIZE: usize = 3;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/profile", put(update_profile))
        .route("/api/state", get(get_ui_state))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/food/entries", get(get_food_entries).post(add_food_entry))
        .route("/api/food/entries/import", post(import_food_entries))
        .route("/api/food/entries/{id}", delete(delete_food_entry))
        .route("/api/exercises", get(get_exercises).post(add_exercise))
        .route("/api/exercises/{id}", delete(delete_exercise))
        .route("/api/meals", get(get_meals).post(add_meal))
        .route("/api/meals/{id}", delete(delete_meal))
        .route("/api/meals/{id}/items", post(add_meal_item))
        .route("/api/meals/{id}/items/{item_id}", delete(remove_meal_item))
        .route("/api/search", post(search_food))
        .route("/api/search/results", get(get_search_results))
        .route("/api/analyze", post(analyze_photo))
        .route("/api/account", delete(delete_account))
}

#[derive(Deserialize)]
struct DayQuery {
    /// Calendar day, "YYYY-MM-DD". Defaults to today in the configured offset.
    date: Option<NaiveDate>,
}

impl DayQuery {
    fn resolve(&self, state: &AppState) -> NaiveDate {
        self.date.unwrap_or_else(|| state.today())
    }
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(profile))
}

#[derive(Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1))]
    name: Option<String>,
    photo_url: Option<String>,
    #[validate(range(min = 50.0, max = 280.0))]
    height_cm: Option<f64>,
    #[validate(range(min = 20.0, max = 500.0))]
    weight_kg: Option<f64>,
    #[validate(range(min = 10, max = 120))]
    age: Option<u32>,
    gender: Option<Gender>,
    goal_type: Option<GoalType>,
    #[validate(range(min = 20.0, max = 500.0))]
    target_weight_kg: Option<f64>,
    activity_level: Option<ActivityLevel>,
}

/// Update profile fields and recompute the derived energy targets.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    payload.validate()?;

    let profile = state
        .ui
        .with_async_state(
            state.auth.update_profile(&user.user_id, |profile| {
                if let Some(name) = payload.name {
                    profile.name = name;
                }
                if payload.photo_url.is_some() {
                    profile.photo_url = payload.photo_url;
                }
                if payload.height_cm.is_some() {
                    profile.height_cm = payload.height_cm;
                }
                if payload.weight_kg.is_some() {
                    profile.weight_kg = payload.weight_kg;
                }
                if payload.age.is_some() {
                    profile.age = payload.age;
                }
                if payload.gender.is_some() {
                    profile.gender = payload.gender;
                }
                if payload.goal_type.is_some() {
                    profile.goal_type = payload.goal_type;
                }
                if payload.target_weight_kg.is_some() {
                    profile.target_weight_kg = payload.target_weight_kg;
                }
                if payload.activity_level.is_some() {
                    profile.activity_level = payload.activity_level;
                }
            }),
            UiState::Updating,
            Some("Updating profile...".to_string()),
        )
        .await?;

    Ok(Json(profile))
}

// ─── Operation State ─────────────────────────────────────────

/// Current UI-state snapshot for the shell to render.
async fn get_ui_state(State(state): State<Arc<AppState>>) -> Json<UiStateData> {
    Json(state.ui.snapshot())
}

// ─── Dashboard ───────────────────────────────────────────────

/// One day's aggregated dashboard numbers (cached).
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DayQuery>,
) -> Result<Json<DailySummary>> {
    let day = query.resolve(&state);
    let summary = state.dashboard.daily_summary(&user.user_id, day).await?;
    Ok(Json(summary))
}

// ─── Food Entries ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct FoodEntryRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(range(min = 0.0))]
    calories: f64,
    #[validate(range(min = 0.0))]
    protein: Option<f64>,
    #[validate(range(min = 0.0))]
    carbs: Option<f64>,
    #[validate(range(min = 0.0))]
    fat: Option<f64>,
    image_url: Option<String>,
    /// Defaults to now
    timestamp: Option<DateTime<Utc>>,
}

impl FoodEntryRequest {
    fn into_entry(self, user_id: &str) -> FoodEntry {
        FoodEntry {
            id: String::new(),
            user_id: user_id.to_string(),
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
            image_url: self.image_url,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

#[derive(Serialize)]
pub struct EntryCreatedResponse {
    pub id: String,
}

/// List food entries (optionally one day's).
async fn get_food_entries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<FoodEntry>>> {
    state
        .food
        .fetch_entries(&user.user_id, query.date)
        .await?;
    Ok(Json(state.food.entries()))
}

/// Log a food entry.
async fn add_food_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<FoodEntryRequest>,
) -> Result<Json<EntryCreatedResponse>> {
    payload.validate()?;

    let entry = payload.into_entry(&user.user_id);
    let day = state.day_of(entry.timestamp);

    let id = state
        .ui
        .with_async_state(
            state.food.add_entry(entry),
            UiState::Saving,
            Some("Saving food entry...".to_string()),
        )
        .await?;

    state.dashboard.invalidate_day(&user.user_id, day);
    Ok(Json(EntryCreatedResponse { id }))
}

#[derive(Deserialize, Validate)]
pub struct ImportFoodEntriesRequest {
    #[validate(nested)]
    entries: Vec<FoodEntryRequest>,
    batch_size: Option<usize>,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub ids: Vec<String>,
}

/// Import a batch of food entries (chunked writes with progress).
async fn import_food_entries(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ImportFoodEntriesRequest>,
) -> Result<Json<ImportResponse>> {
    payload.validate()?;

    let batch_size = payload.batch_size.unwrap_or(IMPORT_BATCH_SIZE);
    let entries: Vec<FoodEntry> = payload
        .entries
        .into_iter()
        .map(|request| {
            let mut entry = request.into_entry(&user.user_id);
            entry.id = crate::db::firestore::generate_document_id();
            entry
        })
        .collect();

    let ops: Vec<_> = entries
        .into_iter()
        .map(|entry| {
            let db = state.db.clone();
            move || async move {
                db.set_food_entry(&entry).await?;
                Ok::<String, AppError>(entry.id.clone())
            }
        })
        .collect();

    let ids = state.ui.with_batch_operations(ops, batch_size).await?;

    state.dashboard.invalidate_all();
    Ok(Json(ImportResponse {
        imported: ids.len(),
        ids,
    }))
}

/// Delete a food entry.
async fn delete_food_entry(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    // Resolve the entry's day before it disappears, for cache invalidation
    let day = state
        .food
        .entries()
        .iter()
        .find(|entry| entry.id == entry_id)
        .map(|entry| state.day_of(entry.timestamp));

    state.food.delete_entry(&entry_id).await?;

    match day {
        Some(day) => state.dashboard.invalidate_day(&user.user_id, day),
        None => state.dashboard.invalidate_all(),
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Exercises ───────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ExerciseRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(range(min = 0.0))]
    duration_minutes: f64,
    #[validate(range(min = 0.0))]
    calories_burned: f64,
    timestamp: Option<DateTime<Utc>>,
}

/// List exercise sessions (optionally one day's).
async fn get_exercises(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<ExerciseEntry>>> {
    state
        .exercise
        .fetch_entries(&user.user_id, query.date)
        .await?;
    Ok(Json(state.exercise.entries()))
}

/// Log an exercise session.
async fn add_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<ExerciseRequest>,
) -> Result<Json<EntryCreatedResponse>> {
    payload.validate()?;

    let entry = ExerciseEntry {
        id: String::new(),
        user_id: user.user_id.clone(),
        name: payload.name,
        duration_minutes: payload.duration_minutes,
        calories_burned: payload.calories_burned,
        timestamp: payload.timestamp.unwrap_or_else(Utc::now),
    };
    let day = state.day_of(entry.timestamp);

    let id = state
        .ui
        .with_async_state(
            state.exercise.add_entry(entry),
            UiState::Saving,
            Some("Saving exercise...".to_string()),
        )
        .await?;

    state.dashboard.invalidate_day(&user.user_id, day);
    Ok(Json(EntryCreatedResponse { id }))
}

/// Delete an exercise session.
async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(entry_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let day = state
        .exercise
        .entries()
        .iter()
        .find(|entry| entry.id == entry_id)
        .map(|entry| state.day_of(entry.timestamp));

    state.exercise.delete_entry(&entry_id).await?;

    match day {
        Some(day) => state.dashboard.invalidate_day(&user.user_id, day),
        None => state.dashboard.invalidate_all(),
    }

    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Meals ───────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct MealItemRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(range(min = 0.0))]
    calories: f64,
    #[validate(range(min = 0.0))]
    protein: Option<f64>,
    #[validate(range(min = 0.0))]
    carbs: Option<f64>,
    #[validate(range(min = 0.0))]
    fat: Option<f64>,
}

impl MealItemRequest {
    fn into_item(self) -> MealItem {
        MealItem {
            id: String::new(),
            name: self.name,
            calories: self.calories,
            protein: self.protein,
            carbs: self.carbs,
            fat: self.fat,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct AddMealRequest {
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
    #[validate(length(min = 1, message = "time is required"))]
    time: String,
    date: Option<DateTime<Utc>>,
    #[validate(nested, length(min = 1, message = "at least one item is required"))]
    items: Vec<MealItemRequest>,
}

/// List meals for a day.
async fn get_meals(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Vec<Meal>>> {
    let day = query.resolve(&state);
    state.meals.fetch_for_date(&user.user_id, day).await?;
    Ok(Json(state.meals.meals()))
}

/// Create a meal from its items.
async fn add_meal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AddMealRequest>,
) -> Result<Json<EntryCreatedResponse>> {
    payload.validate()?;

    let date = payload.date.unwrap_or_else(Utc::now);
    let items: Vec<MealItem> = payload
        .items
        .into_iter()
        .map(|item| {
            let mut item = item.into_item();
            item.id = crate::db::firestore::generate_document_id();
            item
        })
        .collect();

    let id = state
        .ui
        .with_async_state(
            state
                .meals
                .add_meal(&user.user_id, &payload.name, &payload.time, date, items),
            UiState::Saving,
            Some("Saving meal...".to_string()),
        )
        .await?;

    state
        .dashboard
        .invalidate_day(&user.user_id, state.day_of(date));
    Ok(Json(EntryCreatedResponse { id }))
}

/// Add an item to a meal (optimistic).
async fn add_meal_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meal_id): Path<String>,
    Json(payload): Json<MealItemRequest>,
) -> Result<Json<serde_json::Value>> {
    payload.validate()?;

    state
        .meals
        .add_item(&state.ui, &meal_id, payload.into_item())
        .await?;

    state.ui.set_success(Some("Meal updated".to_string()), None);
    state.dashboard.invalidate_day(&user.user_id, state.today());
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Remove an item from a meal (optimistic).
async fn remove_meal_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((meal_id, item_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    state
        .meals
        .remove_item(&state.ui, &meal_id, &item_id)
        .await?;

    state.ui.set_success(Some("Meal updated".to_string()), None);
    state.dashboard.invalidate_day(&user.user_id, state.today());
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Delete a meal.
async fn delete_meal(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(meal_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state
        .ui
        .with_async_state(
            state.meals.delete_meal(&meal_id),
            UiState::Updating,
            Some("Deleting meal...".to_string()),
        )
        .await?;

    state.dashboard.invalidate_day(&user.user_id, state.today());
    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Search ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
pub struct SearchAcceptedResponse {
    pub accepted: bool,
}

/// Record a search-input event; execution is debounced.
async fn search_food(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SearchRequest>,
) -> Json<SearchAcceptedResponse> {
    state.search.search_food(&payload.query, &user.user_id);
    Json(SearchAcceptedResponse { accepted: true })
}

/// Current suggestions, searching flag, and error.
async fn get_search_results(State(state): State<Arc<AppState>>) -> Json<SearchResults> {
    Json(state.search.results())
}

// ─── Photo Analysis ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct AnalyzePhotoRequest {
    #[validate(length(min = 1, message = "image is required"))]
    image_base64: String,
}

/// Estimate nutrition from a photo. Rapid duplicate taps are dropped by the
/// click guard.
async fn analyze_photo(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AnalyzePhotoRequest>,
) -> Result<Json<NutritionEstimate>> {
    payload.validate()?;

    BASE64
        .decode(payload.image_base64.as_bytes())
        .map_err(|_| AppError::BadRequest("image_base64 is not valid base64".to_string()))?;

    let slot: Arc<Mutex<Option<Result<NutritionEstimate>>>> = Arc::new(Mutex::new(None));

    let ui = state.ui.clone();
    let vision = state.vision.clone();
    let image = payload.image_base64;
    let outcome = Arc::clone(&slot);

    let ran = state
        .ui
        .with_debounce(move || async move {
            let result = ui
                .with_async_state(
                    vision.analyze_food_image(&image),
                    UiState::Calculating,
                    Some("Analyzing photo...".to_string()),
                )
                .await;
            let failed = result.is_err();
            *outcome.lock().unwrap() = Some(result);
            if failed {
                return Err(AppError::VisionApi("analysis failed".to_string()));
            }
            Ok(())
        })
        .await;

    if !ran {
        return Err(AppError::BadRequest(
            "Duplicate tap ignored; analysis already in progress".to_string(),
        ));
    }

    let result = slot
        .lock()
        .unwrap()
        .take()
        .unwrap_or_else(|| Err(AppError::VisionApi("analysis produced no result".to_string())));
    result.map(Json)
}

// ─── Account Deletion ────────────────────────────────────────

#[derive(Serialize)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub deleted_documents: usize,
}

/// Delete the account and all associated data.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    tracing::info!(user_id = %user.user_id, "User-initiated account deletion");

    let deleted = state.db.delete_user_data(&user.user_id).await?;

    state.auth.sign_out();
    state.dashboard.invalidate_all();
    state.ui.set_idle();

    Ok(Json(DeleteAccountResponse {
        success: true,
        deleted_documents: deleted,
    }))
}
