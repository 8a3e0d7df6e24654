// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Debounced food-search dispatcher.
//!
//! Each input event restarts a quiet-period countdown; only the last query
//! survives a burst. A superseded execution is aborted outright, which also
//! cancels its in-flight catalog request. When the countdown expires, local
//! prefix matches and external catalog results are merged (local first) up
//! to a fixed cap and the suggestion list is replaced atomically.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::FoodEntry;
use crate::services::food_api::{FoodDatabaseClient, FoodSearchItem, CATALOG_RESULT_LIMIT};
use crate::services::FoodService;

/// Quiet period before a search executes.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Maximum local prefix matches merged into the suggestions.
pub const LOCAL_RESULT_LIMIT: usize = 5;

/// Cap on the merged suggestion list.
pub const MERGED_RESULT_LIMIT: usize = 10;

/// One suggestion, tagged by where it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SearchSuggestion {
    /// Previously-logged entry from the local store
    Logged { entry: FoodEntry },
    /// Match from the external food database
    Catalog { item: FoodSearchItem },
}

/// Current search output for the UI shell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub suggestions: Vec<SearchSuggestion>,
    pub searching: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct SearchInner {
    food: FoodService,
    catalog: FoodDatabaseClient,
    debounce: Duration,
    results: Mutex<SearchResults>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Debounced search dispatcher, shared across input events.
#[derive(Clone)]
pub struct SearchDispatcher {
    inner: Arc<SearchInner>,
}

impl SearchDispatcher {
    pub fn new(food: FoodService, catalog: FoodDatabaseClient) -> Self {
        Self::with_debounce(food, catalog, SEARCH_DEBOUNCE)
    }

    pub fn with_debounce(
        food: FoodService,
        catalog: FoodDatabaseClient,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                food,
                catalog,
                debounce,
                results: Mutex::new(SearchResults::default()),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Record a search-input event. Restarts the countdown; the pending
    /// execution (and its in-flight request) is cancelled.
    pub fn search_food(&self, query: &str, user_id: &str) {
        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        let user_id = user_id.to_string();

        let mut pending = self.inner.pending.lock().unwrap();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.debounce).await;
            inner.execute(&query, &user_id).await;
        }));
    }

    /// Cancel any pending execution without clearing results.
    pub fn cancel_pending(&self) {
        if let Some(handle) = self.inner.pending.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Snapshot of the current results.
    pub fn results(&self) -> SearchResults {
        self.inner.results.lock().unwrap().clone()
    }
}

impl SearchInner {
    async fn execute(&self, query: &str, _user_id: &str) {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            let mut results = self.results.lock().unwrap();
            results.suggestions.clear();
            results.searching = false;
            results.error = None;
            return;
        }

        {
            let mut results = self.results.lock().unwrap();
            results.searching = true;
            results.error = None;
        }

        let local = self.food.prefix_matches(trimmed, LOCAL_RESULT_LIMIT);

        match self.catalog.search(trimmed).await {
            Ok(catalog_items) => {
                let mut merged: Vec<SearchSuggestion> = local
                    .into_iter()
                    .map(|entry| SearchSuggestion::Logged { entry })
                    .collect();
                merged.extend(
                    catalog_items
                        .into_iter()
                        .take(CATALOG_RESULT_LIMIT)
                        .map(|item| SearchSuggestion::Catalog { item }),
                );
                merged.truncate(MERGED_RESULT_LIMIT);

                let mut results = self.results.lock().unwrap();
                results.suggestions = merged;
                results.searching = false;
            }
            Err(err) => {
                tracing::warn!(error = %err, query = trimmed, "Food search failed");
                let mut results = self.results.lock().unwrap();
                results.error = Some(err.to_string());
                results.searching = false;
            }
        }
    }
}
