// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication tests.
//!
//! These tests verify that JWT tokens created by the auth routes can be
//! decoded by the auth middleware, catching compatibility issues early.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use macro_tracker::middleware::auth::{create_jwt, Claims};

#[test]
fn test_jwt_roundtrip() {
    // This test verifies that a JWT created by the auth flow can be decoded
    // by the middleware. If either side changes the Claims structure or
    // algorithm, this test will fail.

    let signing_key = b"test_signing_key_32_bytes_long!!";
    let user_id = "provider-user-123";

    let token = create_jwt(user_id, signing_key).expect("Failed to create JWT");

    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(&token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(token_data.claims.sub, user_id);
    assert!(token_data.claims.exp > token_data.claims.iat);
}

#[test]
fn test_jwt_rejects_wrong_key() {
    let token = create_jwt("user-1", b"correct_key_32_bytes_long_please").unwrap();

    let key = DecodingKey::from_secret(b"different_key_32_bytes_long_pls!");
    let validation = Validation::new(Algorithm::HS256);

    assert!(decode::<Claims>(&token, &key, &validation).is_err());
}
