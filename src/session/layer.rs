// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum integration for sessions.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(axum::middleware::from_fn_with_state(
//!         sessions.clone(),
//!         session_middleware,
//!     ));
//!
//! async fn handler(session: SessionHandle) -> String {
//!     session.user_id().unwrap_or_default()
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::error;

use super::{cookies, Session, SessionStore};
use crate::error::ApiError;

/// Shared view of the current request's session.
///
/// Cloning is cheap; every clone sees the same session.
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        // A panicking handler cannot leave the map half-written.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the session as it stands now.
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    pub fn id(&self) -> String {
        self.lock().id().to_string()
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().user_id()
    }

    pub fn set_user_id(&self, user_id: &str) {
        self.lock().set_user_id(user_id);
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.lock().get(key)
    }

    pub fn insert<T: Serialize>(
        &self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        self.lock().insert(key, value)
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.lock().remove(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or_else(|| {
                error!(path = %parts.uri.path(), "Session requested on a route without the session layer");
                ApiError::internal("Session layer is not installed")
            })
    }
}

/// Open the session before the handler runs and save it afterwards.
pub async fn session_middleware(
    State(store): State<Arc<SessionStore>>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_value = cookies::find_cookie(request.headers(), &store.settings().cookie_name);
    let handle = SessionHandle::new(store.open(cookie_value.as_deref()));
    request.extensions_mut().insert(handle.clone());

    let mut response = next.run(request).await;

    let session = handle.snapshot();
    let instruction = match store.save(&session) {
        Ok(instruction) => instruction,
        Err(e) => {
            error!(error = %e, "Failed to save session");
            return ApiError::from(e).into_response();
        }
    };

    match HeaderValue::from_str(&instruction.header_value()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
            response
        }
        Err(e) => {
            error!(error = %e, "Session cookie is not a valid header value");
            ApiError::internal("Failed to issue session cookie").into_response()
        }
    }
}
