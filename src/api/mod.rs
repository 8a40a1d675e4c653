// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::{
    auth::{require_login, UserProfile},
    session::session_middleware,
    state::AppState,
    storage::{UserAccount, WalletRef},
    wallet::{TokenBalance, WalletOverview, WalletTransaction},
};

pub mod health;
pub mod oauth;
pub mod pages;

/// Assigns a UUID v4 `x-request-id` to requests that arrive without one.
#[derive(Clone, Copy, Default)]
struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(request_id))
    }
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/dashboard", get(pages::dashboard))
        .route_layer(from_fn(require_login));

    // Everything here runs inside a session.
    let pages = Router::new()
        .route("/", get(pages::index))
        .route("/login", get(oauth::login))
        .route("/callback", get(oauth::callback))
        .route("/logout", get(oauth::logout))
        .merge(protected)
        .layer(from_fn_with_state(state.sessions.clone(), session_middleware))
        .with_state(state.clone());

    // Probes stay cookie-free.
    let health = Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(pages)
        .merge(health)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        pages::index,
        pages::dashboard,
        oauth::login,
        oauth::callback,
        oauth::logout,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            pages::HomeView,
            pages::LandingView,
            pages::DashboardView,
            UserAccount,
            UserProfile,
            WalletRef,
            WalletOverview,
            TokenBalance,
            WalletTransaction,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Pages", description = "Landing page and wallet dashboard"),
        (name = "Auth", description = "Google sign-in and sign-out"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
