// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provisioning and dashboard loading.
//!
//! Wallet API failures never fail a page: they are logged and the affected
//! part is left empty. Storage failures do propagate.

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::client::WalletApi;
use super::types::WalletOverview;
use crate::qr::qr_code_png_base64;
use crate::storage::{StorageError, UserAccount, UserRepository};

/// Create a wallet on every chain in `chains` the account does not have yet.
///
/// Wallets created before an API failure are still stored.
pub async fn provision_wallets(
    api: &dyn WalletApi,
    users: &UserRepository,
    account: &UserAccount,
    chains: &[String],
) -> Result<UserAccount, StorageError> {
    let missing: Vec<&String> = chains
        .iter()
        .filter(|chain| !account.wallets.contains_key(chain.as_str()))
        .collect();
    if missing.is_empty() {
        return Ok(account.clone());
    }

    let wallet_set_id = match api.wallet_set_id().await {
        Ok(id) => id,
        Err(e) => {
            warn!(user_id = %account.user_id, error = %e, "Wallet set unavailable; skipping provisioning");
            return Ok(account.clone());
        }
    };

    let mut created = BTreeMap::new();
    for chain in missing {
        match api
            .create_wallet(&wallet_set_id, &account.user_id, chain)
            .await
        {
            Ok(wallet) => {
                info!(
                    user_id = %account.user_id,
                    blockchain = %chain,
                    wallet_id = %wallet.wallet_id,
                    "Provisioned wallet"
                );
                created.insert(chain.clone(), wallet);
            }
            Err(e) => {
                warn!(user_id = %account.user_id, blockchain = %chain, error = %e, "Wallet creation failed");
                break;
            }
        }
    }

    if created.is_empty() {
        return Ok(account.clone());
    }
    users.attach_wallets(&account.user_id, created)
}

/// Balances and recent transfers of every wallet of the account.
pub async fn load_overview(api: &dyn WalletApi, account: &UserAccount) -> Vec<WalletOverview> {
    let mut overview = Vec::with_capacity(account.wallets.len());

    for (blockchain, wallet) in &account.wallets {
        let (balances, transactions) = tokio::join!(
            api.list_balances(&wallet.wallet_id),
            api.list_recent_transactions(&wallet.wallet_id),
        );

        let balances = balances.unwrap_or_else(|e| {
            warn!(wallet_id = %wallet.wallet_id, error = %e, "Balance lookup failed");
            Vec::new()
        });
        let recent_transactions = transactions.unwrap_or_else(|e| {
            warn!(wallet_id = %wallet.wallet_id, error = %e, "Transaction lookup failed");
            Vec::new()
        });

        let qr_code = match qr_code_png_base64(&wallet.address) {
            Ok(png) => Some(png),
            Err(e) => {
                warn!(wallet_id = %wallet.wallet_id, error = %e, "Deposit QR code failed");
                None
            }
        };

        overview.push(WalletOverview {
            blockchain: blockchain.clone(),
            wallet: wallet.clone(),
            qr_code,
            balances,
            recent_transactions,
        });
    }

    overview
}
