// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Macro-Tracker API Server
//!
//! Serves the application core for the nutrition/fitness UI shell: auth,
//! food/meal/exercise logging, debounced food search, photo analysis, and
//! cached dashboard aggregation.

use macro_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{
        AuthService, DashboardService, ExerciseService, FoodDatabaseClient, FoodService,
        IdentityClient, MealService, SearchDispatcher, VisionClient,
    },
    time_utils::offset_from_minutes,
    ui_state::{UiStateController, UiStateOptions},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Macro-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let day_offset = offset_from_minutes(config.day_offset_minutes);

    // External collaborators
    let identity = IdentityClient::new(
        config.identity_api_url.clone(),
        config.identity_api_key.clone(),
    );
    let catalog = FoodDatabaseClient::new(
        config.food_api_url.clone(),
        config.food_api_app_id.clone(),
        config.food_api_key.clone(),
    );
    let vision = VisionClient::new(
        config.vision_api_url.clone(),
        config.vision_api_key.clone(),
        config.vision_model.clone(),
    );

    // Entry stores
    let auth = AuthService::new(identity, db.clone());
    let food = FoodService::new(db.clone(), day_offset);
    let exercise = ExerciseService::new(db.clone(), day_offset);
    let meals = MealService::new(db.clone(), day_offset);

    // Cached dashboard aggregation
    let dashboard = DashboardService::new(
        db.clone(),
        food.clone(),
        exercise.clone(),
        Duration::from_secs(config.dashboard_cache_ttl_secs),
    );
    tracing::info!(
        ttl_secs = config.dashboard_cache_ttl_secs,
        "Dashboard cache initialized"
    );

    // Debounced search over local store + external catalog
    let search = SearchDispatcher::new(food.clone(), catalog);

    // Operation-state controller with optimistic updates
    let ui = UiStateController::new(UiStateOptions {
        optimistic_updates: true,
        ..Default::default()
    });

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
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

    // React to auth-state changes: prefetch on sign-in, clear on sign-out
    let watcher_state = state.clone();
    tokio::spawn(async move {
        let mut auth_rx = watcher_state.auth.subscribe();
        while auth_rx.changed().await.is_ok() {
            let signed_in = auth_rx.borrow_and_update().clone();
            match signed_in {
                Some(user) => {
                    tracing::info!(user_id = %user.user_id, "Auth state: signed in");
                    if let Err(err) = watcher_state.meals.fetch_today(&user.user_id).await {
                        tracing::warn!(error = %err, "Failed to prefetch meals after sign-in");
                    }
                }
                None => {
                    tracing::info!("Auth state: signed out");
                    watcher_state.dashboard.invalidate_all();
                    watcher_state.search.cancel_pending();
                }
            }
        }
    });

    // Build router
    let app = macro_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("macro_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
