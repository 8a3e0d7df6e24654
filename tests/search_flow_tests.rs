// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end search and photo-analysis flows over the HTTP surface.
//!
//! The search dispatcher debounces with real timers here, so these tests
//! wait out the quiet period before polling results.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::time::Duration;
use tower::ServiceExt;

mod common;

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_search_debounces_and_returns_catalog_matches() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    // Two rapid inputs: only the second should reach the catalog
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/search",
            &token,
            r#"{"query": "a"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/search",
            &token,
            r#"{"query": "apple"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Wait out the quiet period plus headroom
    tokio::time::sleep(Duration::from_millis(600)).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/search/results")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let results = body_json(response).await;
    assert_eq!(results["searching"], false);
    let suggestions = results["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["source"], "catalog");
    assert_eq!(suggestions[0]["item"]["label"], "apple");
}

#[tokio::test]
async fn test_empty_search_clears_suggestions() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/search",
            &token,
            r#"{"query": "apple"}"#,
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/search",
            &token,
            r#"{"query": "  "}"#,
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/search/results")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let results = body_json(response).await;
    assert_eq!(results["suggestions"].as_array().unwrap().len(), 0);
    assert_eq!(results["searching"], false);
}

#[tokio::test]
async fn test_analyze_photo_returns_estimate() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    // "hello" in base64
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/analyze",
            &token,
            r#"{"image_base64": "aGVsbG8="}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let estimate = body_json(response).await;
    assert_eq!(estimate["name"], "Grilled chicken");
    assert_eq!(estimate["calories"], 165.0);
}

#[tokio::test]
async fn test_rapid_duplicate_analyze_is_dropped() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-1", &state.config.jwt_signing_key);

    let first = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/analyze",
            &token,
            r#"{"image_base64": "aGVsbG8="}"#,
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    // Immediately again: the click guard drops it
    let second = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/analyze",
            &token,
            r#"{"image_base64": "aGVsbG8="}"#,
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}
