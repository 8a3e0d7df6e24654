// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests (require the emulator).

use chrono::{NaiveDate, TimeZone, Utc};
use macro_tracker::models::{ExerciseEntry, FoodEntry, UserProfile};
use macro_tracker::services::{ExerciseService, FoodService};
use macro_tracker::time_utils::{local_day_bounds, offset_from_minutes};

mod common;
use common::test_db;

fn entry(id: &str, user: &str, calories: f64, day: u32) -> FoodEntry {
    FoodEntry {
        id: id.to_string(),
        user_id: user.to_string(),
        name: format!("Food {}", id),
        calories,
        protein: Some(10.0),
        carbs: Some(20.0),
        fat: None,
        image_url: None,
        timestamp: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_user_profile_roundtrip() {
    require_emulator!();
    let db = test_db().await;

    let profile = UserProfile::new(
        "it-user-1".to_string(),
        "it@example.com".to_string(),
        "Integration".to_string(),
        "2024-01-15T12:00:00Z".to_string(),
    );
    db.upsert_user(&profile).await.unwrap();

    let loaded = db.get_user("it-user-1").await.unwrap().unwrap();
    assert_eq!(loaded.email, "it@example.com");
    assert!(loaded.needs_onboarding());

    db.delete_user_data("it-user-1").await.unwrap();
    assert!(db.get_user("it-user-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_day_range_query_filters_entries() {
    require_emulator!();
    let db = test_db().await;
    let user = "it-user-range";

    db.batch_set_food_entries(&[
        entry("r1", user, 500.0, 1),
        entry("r2", user, 300.0, 2),
        entry("r3", user, 250.0, 2),
    ])
    .await
    .unwrap();

    let offset = offset_from_minutes(0);
    let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let range = local_day_bounds(jan2, offset);

    let fetched = db.list_food_entries(user, Some(range)).await.unwrap();
    assert_eq!(fetched.len(), 2);
    assert!(fetched.iter().all(|e| e.timestamp >= range.0 && e.timestamp < range.1));

    db.delete_user_data(user).await.unwrap();
}

#[tokio::test]
async fn test_food_service_add_then_aggregate() {
    require_emulator!();
    let db = test_db().await;
    let user = "it-user-agg";
    let offset = offset_from_minutes(0);
    let food = FoodService::new(db.clone(), offset);

    food.add_entry(entry("", user, 500.0, 1)).await.unwrap();
    food.add_entry(entry("", user, 120.0, 1)).await.unwrap();

    let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(food.total_calories(jan1), 620.0);

    let jan3 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    food.fetch_entries(user, None).await.unwrap();
    assert_eq!(food.total_calories(jan3), 0.0);

    db.delete_user_data(user).await.unwrap();
}

#[tokio::test]
async fn test_exercise_service_roundtrip() {
    require_emulator!();
    let db = test_db().await;
    let user = "it-user-ex";
    let exercise = ExerciseService::new(db.clone(), offset_from_minutes(0));

    exercise
        .add_entry(ExerciseEntry {
            id: String::new(),
            user_id: user.to_string(),
            name: "Swimming".to_string(),
            duration_minutes: 40.0,
            calories_burned: 350.0,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap(),
        })
        .await
        .unwrap();

    let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    assert_eq!(exercise.total_duration(jan1), 40.0);
    assert_eq!(exercise.total_calories_burned(jan1), 350.0);

    db.delete_user_data(user).await.unwrap();
}
