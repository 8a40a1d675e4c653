// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Revenant Wallet Web - Google sign-in and a custodial wallet dashboard
//!
//! Visitors sign in with Google; each account is given a Circle
//! developer-controlled wallet per configured chain, whose balances and
//! recent transfers the dashboard shows. Sign-in state lives in server-side
//! sessions keyed by an opaque cookie.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers and router (Axum)
//! - `auth` - OAuth login flow and the login guard
//! - `session` - Server-side session store, middleware and sweeper
//! - `qr` - Deposit address QR codes
//! - `storage` - Account records (redb)
//! - `wallet` - Custodial wallet API client and dashboard loading

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod format;
pub mod qr;
pub mod session;
pub mod state;
pub mod storage;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;
