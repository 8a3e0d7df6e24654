// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! External food database client.
//!
//! Wraps a food-database REST API (Edamam-style parser endpoint). Results are
//! capped client-side; the dispatcher merges them with local matches.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::AppError;

/// Maximum results taken from the external database per query.
pub const CATALOG_RESULT_LIMIT: usize = 5;

/// One food match from the external database.
#[derive(Debug, Clone, Serialize)]
pub struct FoodSearchItem {
    pub label: String,
    pub energy_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub image_url: Option<String>,
}

#[derive(Clone)]
struct MockCatalog {
    items: Vec<FoodSearchItem>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

/// Food database API client.
#[derive(Clone)]
pub struct FoodDatabaseClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
    mock: Option<MockCatalog>,
}

impl FoodDatabaseClient {
    pub fn new(base_url: String, app_id: String, app_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            app_id,
            app_key,
            mock: None,
        }
    }

    /// Create an offline client returning canned items (for tests).
    pub fn new_mock(items: Vec<FoodSearchItem>) -> Self {
        Self::mock_with(items, false)
    }

    /// Create an offline client whose every search fails (for tests).
    pub fn new_mock_failing() -> Self {
        Self::mock_with(Vec::new(), true)
    }

    fn mock_with(items: Vec<FoodSearchItem>, fail: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            app_id: String::new(),
            app_key: String::new(),
            mock: Some(MockCatalog {
                items,
                fail,
                queries: Arc::new(Mutex::new(Vec::new())),
            }),
        }
    }

    /// Queries seen by the mock, in call order. Empty for real clients.
    pub fn recorded_queries(&self) -> Vec<String> {
        self.mock
            .as_ref()
            .map(|mock| mock.queries.lock().unwrap().clone())
            .unwrap_or_default()
    }

    /// Search the food database, returning at most [`CATALOG_RESULT_LIMIT`]
    /// matches.
    pub async fn search(&self, text: &str) -> Result<Vec<FoodSearchItem>, AppError> {
        if let Some(mock) = &self.mock {
            mock.queries.lock().unwrap().push(text.to_string());
            if mock.fail {
                return Err(AppError::FoodApi("mock food database failure".to_string()));
            }
            let needle = text.to_lowercase();
            return Ok(mock
                .items
                .iter()
                .filter(|item| item.label.to_lowercase().contains(&needle))
                .take(CATALOG_RESULT_LIMIT)
                .cloned()
                .collect());
        }

        let url = format!("{}/parser", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("app_id", self.app_id.as_str()),
                ("app_key", self.app_key.as_str()),
                ("ingr", text),
            ])
            .send()
            .await
            .map_err(|e| AppError::FoodApi(e.to_string()))?;

        let parsed: ParserResponse = Self::check_response_json(response).await?;

        Ok(parsed
            .hints
            .into_iter()
            .take(CATALOG_RESULT_LIMIT)
            .map(|hint| FoodSearchItem {
                label: hint.food.label,
                energy_kcal: hint.food.nutrients.enerc_kcal.unwrap_or(0.0),
                protein: hint.food.nutrients.procnt.unwrap_or(0.0),
                fat: hint.food.nutrients.fat.unwrap_or(0.0),
                carbs: hint.food.nutrients.chocdf.unwrap_or(0.0),
                image_url: hint.food.image,
            })
            .collect())
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::FoodApi(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::FoodApi(format!("JSON parse error: {}", e)))
    }
}

/// Food database parser response.
#[derive(Debug, Deserialize)]
struct ParserResponse {
    #[serde(default)]
    hints: Vec<ParserHint>,
}

#[derive(Debug, Deserialize)]
struct ParserHint {
    food: ParserFood,
}

#[derive(Debug, Deserialize)]
struct ParserFood {
    label: String,
    #[serde(default)]
    nutrients: ParserNutrients,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ParserNutrients {
    #[serde(rename = "ENERC_KCAL")]
    enerc_kcal: Option<f64>,
    #[serde(rename = "PROCNT")]
    procnt: Option<f64>,
    #[serde(rename = "FAT")]
    fat: Option<f64>,
    #[serde(rename = "CHOCDF")]
    chocdf: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> FoodSearchItem {
        FoodSearchItem {
            label: label.to_string(),
            energy_kcal: 100.0,
            protein: 5.0,
            fat: 2.0,
            carbs: 15.0,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_mock_caps_results() {
        let client = FoodDatabaseClient::new_mock(vec![
            item("apple"),
            item("apple pie"),
            item("apple juice"),
            item("apple sauce"),
            item("apple butter"),
            item("apple crumble"),
        ]);

        let results = client.search("apple").await.unwrap();
        assert_eq!(results.len(), CATALOG_RESULT_LIMIT);
        assert_eq!(client.recorded_queries(), vec!["apple".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failure_surfaces_as_food_api_error() {
        let client = FoodDatabaseClient::new_mock_failing();
        let result = client.search("apple").await;
        assert!(matches!(result, Err(AppError::FoodApi(_))));
    }
}
