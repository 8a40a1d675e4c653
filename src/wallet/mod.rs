// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Custodial Wallets
//!
//! Every account gets one developer-controlled wallet per configured chain,
//! created at first login. Balances and transfers are read live from the
//! wallet API on each dashboard view; nothing but the wallet references is
//! stored locally.

pub mod client;
pub mod service;
pub mod types;

pub use client::{CircleClient, CircleConfig, WalletApi, WalletApiError};
pub use service::{load_overview, provision_wallets};
pub use types::{TokenBalance, WalletOverview, WalletTransaction};

/// Chain used when `WALLET_CHAINS` is not set (Arbitrum testnet).
pub const DEFAULT_CHAIN: &str = "ARB-SEPOLIA";
