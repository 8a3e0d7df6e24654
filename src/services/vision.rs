// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vision inference client for photo-based food logging.
//!
//! Sends a base64 JPEG to an OpenAI-compatible chat-completions endpoint and
//! parses the model's JSON reply into a nutrition estimate. The estimate is
//! best-effort; `confidence` is advisory and not enforced anywhere.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const SYSTEM_PROMPT: &str = "You are a nutrition expert AI that analyzes food images \
and provides detailed nutritional information. For each image, provide: \
1. Food name 2. Calories 3. Protein (g) 4. Carbohydrates (g) 5. Fat (g) \
6. Confidence level (0-100). Format your response as a JSON object with these \
exact keys: {\"name\": string, \"calories\": number, \"protein\": number, \
\"carbs\": number, \"fat\": number, \"confidence\": number}";

const USER_PROMPT: &str =
    "Analyze this food image and provide nutritional information in the specified JSON format.";

/// Estimated nutrition for a photographed food.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionEstimate {
    #[serde(default = "default_food_name")]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
    /// Model self-reported confidence, 0-100. Advisory only.
    #[serde(default)]
    pub confidence: f64,
}

fn default_food_name() -> String {
    "Unknown Food".to_string()
}

/// Vision inference API client.
#[derive(Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    mock: Option<NutritionEstimate>,
}

impl VisionClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            mock: None,
        }
    }

    /// Create an offline client returning a canned estimate (for tests).
    pub fn new_mock(estimate: NutritionEstimate) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            api_key: String::new(),
            model: "mock".to_string(),
            mock: Some(estimate),
        }
    }

    /// Analyze a base64-encoded food photo.
    pub async fn analyze_food_image(
        &self,
        image_base64: &str,
    ) -> Result<NutritionEstimate, AppError> {
        if let Some(estimate) = &self.mock {
            return Ok(estimate.clone());
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/jpeg;base64,{}", image_base64)
                            }
                        },
                        { "type": "text", "text": USER_PROMPT }
                    ]
                }
            ],
            "max_tokens": 500,
            "temperature": 0.5
        });

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::VisionApi(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::VisionApi(format!("HTTP {}: {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::VisionApi(format!("JSON parse error: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::VisionApi("empty completion".to_string()))?;

        let estimate: NutritionEstimate = serde_json::from_str(content.trim())
            .map_err(|e| AppError::VisionApi(format!("Unparseable estimate: {}", e)))?;

        tracing::debug!(
            name = %estimate.name,
            confidence = estimate.confidence,
            "Food image analyzed"
        );

        Ok(estimate)
    }
}

/// Chat-completions response envelope.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_defaults_missing_fields() {
        let estimate: NutritionEstimate = serde_json::from_str(r#"{"calories": 320}"#).unwrap();
        assert_eq!(estimate.name, "Unknown Food");
        assert_eq!(estimate.calories, 320.0);
        assert_eq!(estimate.protein, 0.0);
        assert_eq!(estimate.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_mock_returns_canned_estimate() {
        let client = VisionClient::new_mock(NutritionEstimate {
            name: "Feijoada".to_string(),
            calories: 620.0,
            protein: 35.0,
            carbs: 48.0,
            fat: 30.0,
            confidence: 88.0,
        });

        let estimate = client.analyze_food_image("aGVsbG8=").await.unwrap();
        assert_eq!(estimate.name, "Feijoada");
        assert_eq!(estimate.confidence, 88.0);
    }
}
