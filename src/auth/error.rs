// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login flow errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors raised while completing an OAuth login.
#[derive(Debug)]
pub enum AuthError {
    /// Callback arrived without an authorization code
    MissingAuthorizationCode,
    /// Callback `state` does not match the one stored in the session
    StateMismatch,
    /// The provider reported an error on the callback (e.g. `access_denied`)
    ProviderDenied(String),
    /// The provider could not be reached or answered with a failure status
    ProviderUnavailable(String),
    /// The provider answered, but without the fields a login needs
    MalformedIdentityResponse(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthorizationCode => "missing_authorization_code",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::ProviderDenied(_) => "provider_denied",
            AuthError::ProviderUnavailable(_) => "provider_unavailable",
            AuthError::MalformedIdentityResponse(_) => "malformed_identity_response",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorizationCode
            | AuthError::StateMismatch
            | AuthError::ProviderDenied(_) => StatusCode::BAD_REQUEST,
            AuthError::ProviderUnavailable(_) | AuthError::MalformedIdentityResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthorizationCode => {
                write!(f, "Login callback is missing the authorization code")
            }
            AuthError::StateMismatch => write!(f, "Login state does not match; please retry"),
            AuthError::ProviderDenied(reason) => write!(f, "Login was declined: {reason}"),
            AuthError::ProviderUnavailable(msg) => {
                write!(f, "Identity provider is unavailable: {msg}")
            }
            AuthError::MalformedIdentityResponse(msg) => {
                write!(f, "Identity provider returned an unusable response: {msg}")
            }
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, error_code = self.error_code(), "Login failed");
        }
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
