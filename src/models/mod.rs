// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod exercise;
pub mod food;
pub mod user;

pub use exercise::ExerciseEntry;
pub use food::{FoodEntry, MacroTotals, Meal, MealItem};
pub use user::{ActivityLevel, Gender, GoalType, UserProfile};
