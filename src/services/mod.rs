// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod dashboard;
pub mod exercise;
pub mod food;
pub mod food_api;
pub mod meals;
pub mod search;
pub mod vision;

pub use auth::{AuthService, IdentityClient, SignedInUser};
pub use dashboard::{DailySummary, DashboardService};
pub use exercise::ExerciseService;
pub use food::FoodService;
pub use food_api::{FoodDatabaseClient, FoodSearchItem};
pub use meals::MealService;
pub use search::{SearchDispatcher, SearchResults, SearchSuggestion};
pub use vision::{NutritionEstimate, VisionClient};
