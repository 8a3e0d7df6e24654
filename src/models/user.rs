//! User profile model and energy-target derivation.
//!
//! BMR uses the Mifflin-St Jeor equation; TDEE applies the activity-level
//! multiplier; the daily calorie target adjusts TDEE by the user's goal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    WeightLoss,
    WeightGain,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// TDEE multiplier for this activity level.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

/// Calorie deficit/surplus applied for weight loss/gain goals.
const GOAL_ADJUSTMENT_KCAL: f64 = 500.0;

/// Daily target used until the profile has enough data to derive one.
const DEFAULT_DAILY_CALORIES: f64 = 2000.0;

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Auth provider user ID (also used as document ID)
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    /// Height in centimeters
    #[serde(default)]
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub goal_type: Option<GoalType>,
    #[serde(default)]
    pub target_weight_kg: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    /// Derived daily calorie target
    #[serde(default)]
    pub daily_calories: Option<f64>,
    /// Derived basal metabolic rate
    #[serde(default)]
    pub bmr: Option<f64>,
    /// Derived total daily energy expenditure
    #[serde(default)]
    pub tdee: Option<f64>,
    #[serde(default)]
    pub onboarding_completed: bool,
    /// When the profile was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
}

impl UserProfile {
    /// Minimal profile for a freshly signed-up user.
    pub fn new(id: String, email: String, name: String, created_at: String) -> Self {
        Self {
            id,
            email,
            name,
            photo_url: None,
            height_cm: None,
            weight_kg: None,
            age: None,
            gender: None,
            goal_type: None,
            target_weight_kg: None,
            activity_level: None,
            daily_calories: None,
            bmr: None,
            tdee: None,
            onboarding_completed: false,
            created_at,
        }
    }

    /// Mifflin-St Jeor BMR. `None` until weight, height, age and gender are
    /// all known.
    pub fn compute_bmr(&self) -> Option<f64> {
        let weight = self.weight_kg?;
        let height = self.height_cm?;
        let age = self.age? as f64;
        let gender = self.gender?;

        let base = 10.0 * weight + 6.25 * height - 5.0 * age;
        let bmr = match gender {
            Gender::Male => base + 5.0,
            _ => base - 161.0,
        };
        Some(bmr.round())
    }

    /// TDEE from BMR and activity level.
    pub fn compute_tdee(&self) -> Option<f64> {
        let bmr = self.compute_bmr()?;
        let level = self.activity_level?;
        Some((bmr * level.multiplier()).round())
    }

    /// Goal-adjusted daily calorie target. Falls back to a fixed default when
    /// the profile is incomplete.
    pub fn compute_daily_calories(&self) -> f64 {
        let tdee = match self.compute_tdee() {
            Some(tdee) => tdee,
            None => return DEFAULT_DAILY_CALORIES,
        };

        match self.goal_type {
            Some(GoalType::WeightLoss) => (tdee - GOAL_ADJUSTMENT_KCAL).round(),
            Some(GoalType::WeightGain) => (tdee + GOAL_ADJUSTMENT_KCAL).round(),
            _ => tdee,
        }
    }

    /// Recompute derived values after a profile edit. Marks onboarding
    /// complete once the body metrics are all present.
    pub fn refresh_derived(&mut self) {
        if let Some(bmr) = self.compute_bmr() {
            if self.activity_level.is_some() {
                self.bmr = Some(bmr);
                self.tdee = self.compute_tdee();
                self.daily_calories = Some(self.compute_daily_calories());
                self.onboarding_completed = true;
            }
        }
    }

    pub fn needs_onboarding(&self) -> bool {
        !self.onboarding_completed
    }
}
