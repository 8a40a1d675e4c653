// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External identity provider (OAuth 2.0 authorization-code flow).
//!
//! ## Flow
//!
//! 1. `/login` redirects the browser to [`IdentityProvider::authorize_url`]
//! 2. The provider redirects back to `/callback?code=..&state=..`
//! 3. The code is exchanged for an access token
//! 4. The access token fetches the user's profile
//!
//! Only a profile carrying all of id, email, name and picture produces a
//! [`UserProfile`]; anything less is `MalformedIdentityResponse`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

use super::AuthError;

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";
const GOOGLE_SCOPE: &str = "openid email profile";

/// Bearer token returned by the code exchange. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

/// Profile of the signed-in user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub name: String,
    /// Avatar URL
    pub picture: String,
}

impl UserProfile {
    /// Build a profile from a userinfo document.
    ///
    /// The v1 endpoint names the user id `id`; OpenID Connect names it `sub`.
    pub fn from_userinfo(value: &Value) -> Result<Self, AuthError> {
        let user_id = non_empty_str(value, "id")
            .or_else(|| non_empty_str(value, "sub"))
            .ok_or_else(|| missing_field("id"))?;
        let email = non_empty_str(value, "email").ok_or_else(|| missing_field("email"))?;
        let name = non_empty_str(value, "name").ok_or_else(|| missing_field("name"))?;
        let picture = non_empty_str(value, "picture").ok_or_else(|| missing_field("picture"))?;

        Ok(Self {
            user_id,
            email,
            name,
            picture,
        })
    }
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn missing_field(field: &str) -> AuthError {
    AuthError::MalformedIdentityResponse(format!("userinfo is missing `{field}`"))
}

/// Identity provider used by the login routes.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to in order to sign in.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str, redirect_uri: &str)
        -> Result<AccessToken, AuthError>;

    /// Fetch the profile of the token's owner.
    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, AuthError>;
}

/// OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

/// Google as the identity provider.
#[derive(Debug, Clone)]
pub struct GoogleIdentityProvider {
    config: GoogleOAuthConfig,
    authorize_endpoint: Url,
    http: Client,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, AuthError> {
        let authorize_endpoint = Url::parse(GOOGLE_AUTHORIZE_URL)
            .map_err(|e| AuthError::InternalError(format!("invalid authorize URL: {e}")))?;
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::InternalError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            authorize_endpoint,
            http,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let mut url = self.authorize_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", GOOGLE_SCOPE)
            .append_pair("state", state);
        url.into()
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("client_secret", &self.config.client_secret)
            .finish();

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("token request failed: {e}")))?;

        let json = read_json(response, "token").await?;
        parse_token_response(&json)
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, AuthError> {
        let response = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(format!("userinfo request failed: {e}")))?;

        let json = read_json(response, "userinfo").await?;
        let profile = UserProfile::from_userinfo(&json)?;
        debug!(user_id = %profile.user_id, "Fetched identity profile");
        Ok(profile)
    }
}

async fn read_json(response: reqwest::Response, what: &str) -> Result<Value, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::ProviderUnavailable(format!(
            "{what} endpoint returned {status}: {body}"
        )));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| AuthError::MalformedIdentityResponse(format!("{what} body is not JSON: {e}")))
}

fn parse_token_response(json: &Value) -> Result<AccessToken, AuthError> {
    non_empty_str(json, "access_token")
        .map(AccessToken::new)
        .ok_or_else(|| {
            AuthError::MalformedIdentityResponse("token response has no access_token".to_string())
        })
}
