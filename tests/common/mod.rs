// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use macro_tracker::config::Config;
use macro_tracker::db::FirestoreDb;
use macro_tracker::routes::create_router;
use macro_tracker::services::{
    AuthService, DashboardService, ExerciseService, FoodDatabaseClient, FoodService,
    FoodSearchItem, IdentityClient, MealService, NutritionEstimate, SearchDispatcher, VisionClient,
};
use macro_tracker::time_utils::offset_from_minutes;
use macro_tracker::ui_state::{UiStateController, UiStateOptions};
use macro_tracker::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test JWT token signed with the test config's key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    macro_tracker::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create test JWT")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let day_offset = offset_from_minutes(config.day_offset_minutes);

    let catalog = FoodDatabaseClient::new_mock(vec![FoodSearchItem {
        label: "apple".to_string(),
        energy_kcal: 52.0,
        protein: 0.3,
        fat: 0.2,
        carbs: 14.0,
        image_url: None,
    }]);
    let vision = VisionClient::new_mock(NutritionEstimate {
        name: "Grilled chicken".to_string(),
        calories: 165.0,
        protein: 31.0,
        carbs: 0.0,
        fat: 3.6,
        confidence: 90.0,
    });

    let auth = AuthService::new(IdentityClient::new_mock(), db.clone());
    let food = FoodService::new(db.clone(), day_offset);
    let exercise = ExerciseService::new(db.clone(), day_offset);
    let meals = MealService::new(db.clone(), day_offset);
    let dashboard = DashboardService::new(
        db.clone(),
        food.clone(),
        exercise.clone(),
        Duration::from_secs(config.dashboard_cache_ttl_secs),
    );
    let search = SearchDispatcher::new(food.clone(), catalog);
    let ui = UiStateController::new(UiStateOptions {
        optimistic_updates: true,
        ..Default::default()
    });

    let state = Arc::new(AppState {
        config,
        db,
        auth,
        food,
        exercise,
        meals,
        dashboard,
        vision,
        search,
        ui,
        day_offset,
    });

    (create_router(state.clone()), state)
}
