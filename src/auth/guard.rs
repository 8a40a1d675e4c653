// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login guard for protected routes.
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/dashboard", get(dashboard))
//!     .route_layer(axum::middleware::from_fn(require_login));
//! ```
//!
//! The guard must sit inside the session layer.

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::session::SessionHandle;

/// Where anonymous visitors of protected routes are sent.
pub const LOGIN_PATH: &str = "/login";

/// The signed-in user of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
}

/// Redirect anonymous requests to the login page; let signed-in ones through.
pub async fn require_login(session: SessionHandle, mut request: Request, next: Next) -> Response {
    match session.user_id() {
        Some(user_id) => {
            request.extensions_mut().insert(CurrentUser { user_id });
            next.run(request).await
        }
        None => {
            debug!(path = %request.uri().path(), "Anonymous request to protected route");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        parts
            .extensions
            .get::<SessionHandle>()
            .and_then(SessionHandle::user_id)
            .map(|user_id| CurrentUser { user_id })
            .ok_or_else(|| Redirect::to(LOGIN_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use axum::{
        body::Body,
        http::{header::LOCATION, Request, StatusCode},
        middleware::from_fn,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn app(handle: SessionHandle) -> Router {
        Router::new()
            .route(
                "/dashboard",
                get(|user: CurrentUser| async move { user.user_id }),
            )
            .route_layer(from_fn(require_login))
            .layer(Extension(handle))
    }

    #[tokio::test]
    async fn anonymous_request_redirects_to_login() {
        let response = app(SessionHandle::new(Session::new()))
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/login");
    }

    #[tokio::test]
    async fn signed_in_request_reaches_handler() {
        let handle = SessionHandle::new(Session::new());
        handle.set_user_id("google-9");

        let response = app(handle)
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"google-9");
    }

    #[tokio::test]
    async fn current_user_without_guard_reads_session() {
        let mut parts = Request::builder()
            .uri("/")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        assert!(CurrentUser::from_request_parts(&mut parts, &()).await.is_err());

        let handle = SessionHandle::new(Session::new());
        handle.set_user_id("google-3");
        parts.extensions.insert(handle);
        let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.user_id, "google-3");
    }
}
