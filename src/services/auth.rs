// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth provider client and session service.
//!
//! `IdentityClient` wraps the provider's REST endpoints (email/password and
//! Google federated sign-in). `AuthService` layers profile storage on top and
//! broadcasts auth-state changes over a watch channel; stores subscribe to
//! re-derive the current user.

use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::UserProfile;
use crate::time_utils::format_utc_rfc3339;

/// Identity returned by the auth provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderIdentity {
    #[serde(rename = "localId")]
    pub user_id: String,
    pub email: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoUrl")]
    pub photo_url: Option<String>,
}

/// Auth provider REST client (Identity Toolkit style endpoints).
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    mock: bool,
}

impl IdentityClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            mock: false,
        }
    }

    /// Create an offline client accepting any credentials (for tests).
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            api_key: String::new(),
            mock: true,
        }
    }

    fn mock_identity(email: &str) -> ProviderIdentity {
        ProviderIdentity {
            user_id: format!("mock-{}", email.replace(['@', '.'], "-")),
            email: email.to_string(),
            display_name: None,
            photo_url: None,
        }
    }

    /// Create a new email/password account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderIdentity, AppError> {
        if self.mock {
            return Ok(Self::mock_identity(email));
        }
        self.post_credentials("accounts:signUp", email, password)
            .await
    }

    /// Sign in with email/password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderIdentity, AppError> {
        if self.mock {
            return Ok(Self::mock_identity(email));
        }
        self.post_credentials("accounts:signInWithPassword", email, password)
            .await
    }

    /// Federated sign-in with a Google ID token.
    pub async fn sign_in_with_google(
        &self,
        google_id_token: &str,
    ) -> Result<ProviderIdentity, AppError> {
        if self.mock {
            return Ok(Self::mock_identity("google-user@example.com"));
        }

        let url = format!(
            "{}/accounts:signInWithIdp?key={}",
            self.base_url, self.api_key
        );
        let body = serde_json::json!({
            "postBody": format!("id_token={}&providerId=google.com", google_id_token),
            "requestUri": "http://localhost",
            "returnIdpCredential": true,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(e.to_string()))?;

        Self::check_response_json(response).await
    }

    async fn post_credentials(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<ProviderIdentity, AppError> {
        let url = format!("{}/{}?key={}", self.base_url, endpoint, self.api_key);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::AuthProvider(e.to_string()))?;

        Self::check_response_json(response).await
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AuthProvider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::AuthProvider(format!("JSON parse error: {}", e)))
    }
}

/// The currently signed-in user, as broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    pub user_id: String,
    pub email: String,
}

/// Auth session service: provider calls plus profile storage.
#[derive(Clone)]
pub struct AuthService {
    identity: IdentityClient,
    db: FirestoreDb,
    state_tx: Arc<watch::Sender<Option<SignedInUser>>>,
}

impl AuthService {
    pub fn new(identity: IdentityClient, db: FirestoreDb) -> Self {
        let (state_tx, _) = watch::channel(None);
        Self {
            identity,
            db,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Subscribe to auth-state changes. The receiver yields the current user
    /// immediately and on every sign-in/out.
    pub fn subscribe(&self) -> watch::Receiver<Option<SignedInUser>> {
        self.state_tx.subscribe()
    }

    /// The currently signed-in user, if any.
    pub fn current_user(&self) -> Option<SignedInUser> {
        self.state_tx.borrow().clone()
    }

    /// Create an account, store the initial profile, and sign in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<UserProfile, AppError> {
        let identity = self.identity.sign_up(email, password).await?;

        let profile = UserProfile::new(
            identity.user_id.clone(),
            identity.email.clone(),
            name.to_string(),
            format_utc_rfc3339(chrono::Utc::now()),
        );
        self.db.upsert_user(&profile).await?;

        self.broadcast(&identity);
        tracing::info!(user_id = %identity.user_id, "User signed up");
        Ok(profile)
    }

    /// Sign in with email/password and load the stored profile.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let identity = self.identity.sign_in(email, password).await?;

        let profile = self
            .db
            .get_user(&identity.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for {}", identity.user_id)))?;

        self.broadcast(&identity);
        tracing::info!(user_id = %identity.user_id, "User signed in");
        Ok(profile)
    }

    /// Federated Google sign-in; creates a profile on first sign-in.
    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<UserProfile, AppError> {
        let identity = self.identity.sign_in_with_google(id_token).await?;

        let profile = match self.db.get_user(&identity.user_id).await? {
            Some(profile) => profile,
            None => {
                let mut profile = UserProfile::new(
                    identity.user_id.clone(),
                    identity.email.clone(),
                    identity
                        .display_name
                        .clone()
                        .unwrap_or_else(|| "User".to_string()),
                    format_utc_rfc3339(chrono::Utc::now()),
                );
                profile.photo_url = identity.photo_url.clone();
                self.db.upsert_user(&profile).await?;
                profile
            }
        };

        self.broadcast(&identity);
        tracing::info!(user_id = %identity.user_id, "User signed in with Google");
        Ok(profile)
    }

    /// Sign out: clears the broadcast state. Stores observing the channel
    /// drop their collections.
    pub fn sign_out(&self) {
        self.state_tx.send_replace(None);
        tracing::info!("User signed out");
    }

    /// Merge a profile edit, recompute derived energy values, and store.
    pub async fn update_profile(
        &self,
        user_id: &str,
        apply: impl FnOnce(&mut UserProfile),
    ) -> Result<UserProfile, AppError> {
        let mut profile = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for {}", user_id)))?;

        apply(&mut profile);
        profile.refresh_derived();

        self.db.upsert_user(&profile).await?;
        Ok(profile)
    }

    fn broadcast(&self, identity: &ProviderIdentity) {
        self.state_tx.send_replace(Some(SignedInUser {
            user_id: identity.user_id.clone(),
            email: identity.email.clone(),
        }));
    }
}
