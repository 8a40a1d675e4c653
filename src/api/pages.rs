// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Landing and dashboard views.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{CurrentUser, LOGIN_PATH};
use crate::error::ApiError;
use crate::session::{SessionHandle, USER_ID_KEY};
use crate::state::AppState;
use crate::storage::{StorageError, UserAccount};
use crate::wallet::{load_overview, WalletOverview};

/// What an anonymous visitor sees.
#[derive(Debug, Serialize, ToSchema)]
pub struct LandingView {
    /// Where to start signing in
    pub login_url: String,
}

/// What a signed-in user sees.
#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardView {
    pub user: UserAccount,
    pub wallets: Vec<WalletOverview>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum HomeView {
    Landing(LandingView),
    Dashboard(DashboardView),
}

/// Dashboard for `user_id`, or `None` when the account no longer exists.
async fn dashboard_for(state: &AppState, user_id: &str) -> Result<Option<DashboardView>, ApiError> {
    let user = match state.users.get(user_id) {
        Ok(user) => user,
        Err(StorageError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let wallets = load_overview(state.wallets.as_ref(), &user).await;
    Ok(Some(DashboardView { user, wallets }))
}

/// Sessions naming an unknown account are signed out.
fn forget_user(session: &SessionHandle, user_id: &str) {
    tracing::info!(user_id, "Session refers to an unknown account; signing out");
    session.remove(USER_ID_KEY);
}

/// Home page: the dashboard when signed in, the landing view otherwise.
#[utoipa::path(
    get,
    path = "/",
    tag = "Pages",
    responses(
        (status = 200, description = "Landing or dashboard view", body = HomeView),
        (status = 500, description = "Account storage failure")
    )
)]
pub async fn index(
    State(state): State<AppState>,
    session: SessionHandle,
) -> Result<Json<HomeView>, ApiError> {
    let landing = || {
        Json(HomeView::Landing(LandingView {
            login_url: LOGIN_PATH.to_string(),
        }))
    };

    let Some(user_id) = session.user_id() else {
        return Ok(landing());
    };

    match dashboard_for(&state, &user_id).await? {
        Some(view) => Ok(Json(HomeView::Dashboard(view))),
        None => {
            forget_user(&session, &user_id);
            Ok(landing())
        }
    }
}

/// Dashboard of the signed-in user. Anonymous requests are sent to `/login`.
#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Pages",
    responses(
        (status = 200, description = "Dashboard view", body = DashboardView),
        (status = 303, description = "Not signed in; redirect to /login"),
        (status = 500, description = "Account storage failure")
    )
)]
pub async fn dashboard(
    State(state): State<AppState>,
    session: SessionHandle,
    user: CurrentUser,
) -> Result<Response, ApiError> {
    match dashboard_for(&state, &user.user_id).await? {
        Some(view) => Ok(Json(view).into_response()),
        None => {
            forget_user(&session, &user.user_id);
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
    }
}
