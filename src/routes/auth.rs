// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication routes: email/password and Google federated sign-in.

use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::Result;
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::UserProfile;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/google", post(sign_in_google))
        .route("/auth/signout", post(sign_out))
}

#[derive(Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    password: String,
    #[validate(length(min = 1, message = "name is required"))]
    name: String,
}

#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Deserialize, Validate)]
pub struct GoogleSignInRequest {
    #[validate(length(min = 1, message = "id_token is required"))]
    id_token: String,
}

/// Profile payload returned after a successful sign-in.
#[derive(Serialize)]
pub struct AuthResponse {
    pub profile: UserProfile,
    pub needs_onboarding: bool,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build()
}

fn signed_in_response(
    state: &AppState,
    jar: CookieJar,
    profile: UserProfile,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    let token = create_jwt(&profile.id, &state.config.jwt_signing_key)?;
    let jar = jar.add(session_cookie(token));
    let needs_onboarding = profile.needs_onboarding();

    Ok((
        jar,
        Json(AuthResponse {
            profile,
            needs_onboarding,
        }),
    ))
}

async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let profile = state
        .auth
        .sign_up(&payload.email, &payload.password, &payload.name)
        .await?;

    signed_in_response(&state, jar, profile)
}

async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignInRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let profile = state
        .auth
        .sign_in(&payload.email, &payload.password)
        .await?;

    signed_in_response(&state, jar, profile)
}

async fn sign_in_google(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<GoogleSignInRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let profile = state.auth.sign_in_with_google(&payload.id_token).await?;

    signed_in_response(&state, jar, profile)
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SignOutResponse>)> {
    state.auth.sign_out();
    state.dashboard.invalidate_all();
    state.ui.set_idle();

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    Ok((jar, Json(SignOutResponse { success: true })))
}
