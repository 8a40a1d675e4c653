// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::session::SessionStore;
use crate::storage::UserRepository;
use crate::wallet::WalletApi;

/// Shared handles for request handlers. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub users: Arc<UserRepository>,
    pub identity: Arc<dyn IdentityProvider>,
    pub wallets: Arc<dyn WalletApi>,
    /// Chains every account gets a wallet on
    pub wallet_chains: Arc<[String]>,
    /// Absolute OAuth redirect URI (`{PUBLIC_BASE_URL}/callback`)
    pub callback_url: String,
}

#[cfg(test)]
impl AppState {
    /// State over in-memory stores and fake external services.
    pub fn for_tests(
        identity: impl IdentityProvider + 'static,
        wallets: impl WalletApi + 'static,
    ) -> Self {
        use crate::session::{MemorySessionBackend, SessionSettings};
        use crate::storage::open_in_memory;

        let users = UserRepository::new(open_in_memory().expect("in-memory database"))
            .expect("users table");
        Self {
            sessions: Arc::new(SessionStore::new(
                Arc::new(MemorySessionBackend::new()),
                SessionSettings::default(),
            )),
            users: Arc::new(users),
            identity: Arc::new(identity),
            wallets: Arc::new(wallets),
            wallet_chains: Arc::from(vec!["ARB-SEPOLIA".to_string()]),
            callback_url: "http://localhost:8080/callback".to_string(),
        }
    }
}
