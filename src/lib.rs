// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Macro-Tracker: nutrition and exercise tracking core
//!
//! This crate provides the application core behind the mobile UI shell:
//! authentication, food/meal/exercise logging, photo-based nutrition
//! estimation, and cached per-day dashboard aggregation.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod ui_state;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use config::Config;
use db::FirestoreDb;
use services::{
    AuthService, DashboardService, ExerciseService, FoodService, MealService, SearchDispatcher,
    VisionClient,
};
use ui_state::UiStateController;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth: AuthService,
    pub food: FoodService,
    pub exercise: ExerciseService,
    pub meals: MealService,
    pub dashboard: DashboardService,
    pub vision: VisionClient,
    pub search: SearchDispatcher,
    pub ui: UiStateController,
    /// Fixed offset used for calendar-day bucketing
    pub day_offset: FixedOffset,
}

impl AppState {
    /// Today's calendar day in the configured offset.
    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    /// The calendar day a timestamp falls on, in the configured offset.
    pub fn day_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        timestamp.with_timezone(&self.day_offset).date_naive()
    }
}
