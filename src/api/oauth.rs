// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in and sign-out.

use axum::{
    extract::{Query, State},
    response::Redirect,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::AuthError;
use crate::session::{SessionHandle, USER_ID_KEY};
use crate::state::AppState;
use crate::wallet::provision_wallets;

/// Session key holding the anti-forgery `state` of a login in progress.
pub const OAUTH_STATE_KEY: &str = "oauth_state";

/// Query parameters of the provider's redirect back to us.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set instead of `code` when the user declined or the request was bad
    pub error: Option<String>,
}

/// Start a login: remember a fresh `state` and send the browser to the
/// identity provider.
#[utoipa::path(
    get,
    path = "/login",
    tag = "Auth",
    responses(
        (status = 303, description = "Redirect to the identity provider")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Redirect, AuthError> {
    let oauth_state = Uuid::new_v4().simple().to_string();
    session
        .insert(OAUTH_STATE_KEY, &oauth_state)
        .map_err(|e| AuthError::InternalError(format!("failed to store login state: {e}")))?;

    let url = state
        .identity
        .authorize_url(&state.callback_url, &oauth_state);
    Ok(Redirect::to(&url))
}

/// Finish a login.
///
/// The account is created or refreshed and wallets are provisioned before
/// the user id is placed in the session. Wallet API failures do not block
/// the login.
#[utoipa::path(
    get,
    path = "/callback",
    tag = "Auth",
    params(CallbackParams),
    responses(
        (status = 303, description = "Signed in; redirect to /"),
        (status = 400, description = "State mismatch, missing code or login declined"),
        (status = 502, description = "Identity provider failed or returned an unusable profile")
    )
)]
pub async fn callback(
    State(state): State<AppState>,
    session: SessionHandle,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, AuthError> {
    // The state is single-use whatever the outcome.
    let expected: Option<String> = session.get(OAUTH_STATE_KEY);
    session.remove(OAUTH_STATE_KEY);

    if let Some(reason) = params.error {
        return Err(AuthError::ProviderDenied(reason));
    }
    match (expected.as_deref(), params.state.as_deref()) {
        (Some(expected), Some(received)) if expected == received => {}
        _ => return Err(AuthError::StateMismatch),
    }
    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(AuthError::MissingAuthorizationCode)?;

    let token = state
        .identity
        .exchange_code(&code, &state.callback_url)
        .await?;
    let profile = state.identity.fetch_profile(&token).await?;

    let account = state.users.record_login(&profile, Utc::now()).map_err(|e| {
        error!(user_id = %profile.user_id, error = %e, "Failed to record login");
        AuthError::InternalError("failed to record login".to_string())
    })?;
    let account = provision_wallets(
        state.wallets.as_ref(),
        &state.users,
        &account,
        &state.wallet_chains,
    )
    .await
    .map_err(|e| {
        error!(user_id = %account.user_id, error = %e, "Failed to store wallets");
        AuthError::InternalError("failed to store wallets".to_string())
    })?;

    session.set_user_id(&account.user_id);
    info!(user_id = %account.user_id, wallets = account.wallets.len(), "User signed in");
    Ok(Redirect::to("/"))
}

/// Sign out and return to the landing page.
#[utoipa::path(
    get,
    path = "/logout",
    tag = "Auth",
    responses(
        (status = 303, description = "Signed out; redirect to /")
    )
)]
pub async fn logout(session: SessionHandle) -> Redirect {
    if let Some(user_id) = session.remove(USER_ID_KEY) {
        info!(user_id = %user_id, "User signed out");
    }
    Redirect::to("/")
}
