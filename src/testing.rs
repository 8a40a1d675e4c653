// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process stand-ins for the external services, used by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::auth::{AccessToken, AuthError, IdentityProvider, UserProfile};
use crate::format::format_token_amount;
use crate::storage::WalletRef;
use crate::wallet::{TokenBalance, WalletApi, WalletApiError, WalletTransaction};

pub fn sample_profile() -> UserProfile {
    UserProfile {
        user_id: "google-1".to_string(),
        email: "ada@example.com".to_string(),
        name: "Ada".to_string(),
        picture: "https://example.com/ada.png".to_string(),
    }
}

/// Identity provider that accepts the code `good-code` and answers with a
/// fixed profile.
pub struct FakeIdentityProvider {
    profile: Result<UserProfile, String>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self {
            profile: Ok(sample_profile()),
        }
    }

    /// Provider whose profile lookup yields an incomplete document.
    pub fn malformed() -> Self {
        Self {
            profile: Err("userinfo is missing `email`".to_string()),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        format!("https://idp.test/authorize?redirect_uri={redirect_uri}&state={state}")
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> Result<AccessToken, AuthError> {
        if code == "good-code" {
            Ok(AccessToken::new("token"))
        } else {
            Err(AuthError::ProviderUnavailable("invalid_grant".to_string()))
        }
    }

    async fn fetch_profile(&self, _token: &AccessToken) -> Result<UserProfile, AuthError> {
        self.profile
            .clone()
            .map_err(AuthError::MalformedIdentityResponse)
    }
}

/// Wallet API that either always succeeds with canned data or always fails.
pub struct FakeWalletApi {
    fail: bool,
    created: AtomicUsize,
}

impl FakeWalletApi {
    pub fn new() -> Self {
        Self {
            fail: false,
            created: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            created: AtomicUsize::new(0),
        }
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), WalletApiError> {
        if self.fail {
            Err(WalletApiError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WalletApi for FakeWalletApi {
    async fn wallet_set_id(&self) -> Result<String, WalletApiError> {
        self.check()?;
        Ok("ws-1".to_string())
    }

    async fn create_wallet(
        &self,
        _wallet_set_id: &str,
        user_id: &str,
        blockchain: &str,
    ) -> Result<WalletRef, WalletApiError> {
        self.check()?;
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(WalletRef {
            wallet_id: format!("w-{n}"),
            address: format!("0x{user_id}-{blockchain}"),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        })
    }

    async fn list_balances(&self, _wallet_id: &str) -> Result<Vec<TokenBalance>, WalletApiError> {
        self.check()?;
        Ok(vec![TokenBalance {
            symbol: "USDC".to_string(),
            amount: "15231.89".to_string(),
            blockchain: "ARB-SEPOLIA".to_string(),
            token_address: Some("0xusdc".to_string()),
            display_amount: format_token_amount("USDC", "15231.89"),
        }])
    }

    async fn list_recent_transactions(
        &self,
        wallet_id: &str,
    ) -> Result<Vec<WalletTransaction>, WalletApiError> {
        self.check()?;
        Ok(vec![WalletTransaction {
            id: "tx-1".to_string(),
            amounts: vec!["1.00".to_string()],
            blockchain: "ARB-SEPOLIA".to_string(),
            operation: "TRANSFER".to_string(),
            status: "COMPLETE".to_string(),
            tx_hash: Some("0xhash".to_string()),
            create_date: "2026-01-02T00:00:00Z".to_string(),
            wallet_id: wallet_id.to_string(),
            transaction_type: "INBOUND".to_string(),
        }])
    }
}
