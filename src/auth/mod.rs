// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Sign-in is delegated to an external identity provider (Google) through
//! the OAuth 2.0 authorization-code flow. Once the callback succeeds the
//! provider's user id is stored in the server-side session under `user_id`;
//! that key alone marks a request as signed in.
//!
//! ## Security
//!
//! - The `state` parameter is generated per login and kept in the session
//! - Access tokens are used once to read the profile and never stored
//! - Protected routes are wrapped in [`require_login`]

pub mod error;
pub mod guard;
pub mod provider;

pub use error::AuthError;
pub use guard::{require_login, CurrentUser, LOGIN_PATH};
pub use provider::{
    AccessToken, GoogleIdentityProvider, GoogleOAuthConfig, IdentityProvider, UserProfile,
};
