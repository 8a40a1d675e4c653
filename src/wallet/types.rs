// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::WalletRef;

/// Token balance held by a custodial wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    pub symbol: String,
    /// Decimal amount as reported by the wallet API
    pub amount: String,
    pub blockchain: String,
    /// Contract address; absent for the chain's native token
    pub token_address: Option<String>,
    /// Amount prepared for display (`$1,234.50` for USD stablecoins)
    pub display_amount: String,
}

/// A transfer touching a custodial wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletTransaction {
    pub id: String,
    pub amounts: Vec<String>,
    pub blockchain: String,
    pub operation: String,
    /// Provider state, e.g. `COMPLETE` or `FAILED`
    pub status: String,
    pub tx_hash: Option<String>,
    pub create_date: String,
    pub wallet_id: String,
    /// `INBOUND` or `OUTBOUND`
    pub transaction_type: String,
}

/// One wallet on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletOverview {
    pub blockchain: String,
    pub wallet: WalletRef,
    /// Deposit address as a base64 PNG QR code; absent if it could not be rendered
    pub qr_code: Option<String>,
    pub balances: Vec<TokenBalance>,
    pub recent_transactions: Vec<WalletTransaction>,
}
