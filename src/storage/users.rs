// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account records keyed by the identity provider's user id.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{StorageError, StorageResult};
use crate::auth::UserProfile;

/// Primary table: external user id → serialized UserAccount (JSON bytes).
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Reference to a custodial wallet owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WalletRef {
    /// Wallet id at the custodial provider
    pub wallet_id: String,
    /// On-chain address
    pub address: String,
    /// Creation time as reported by the provider
    pub created_at: String,
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserAccount {
    /// Identity provider user id
    pub user_id: String,
    pub email: String,
    pub name: String,
    /// Avatar URL
    pub picture: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    /// Wallets by blockchain code (e.g. `ARB-SEPOLIA`)
    #[serde(default)]
    pub wallets: BTreeMap<String, WalletRef>,
}

pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }

    pub fn find(&self, user_id: &str) -> StorageResult<Option<UserAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, user_id: &str) -> StorageResult<UserAccount> {
        self.find(user_id)?
            .ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))
    }

    /// Create the account on first login, otherwise refresh its profile.
    ///
    /// Wallets and `created_at` of an existing account are preserved.
    pub fn record_login(
        &self,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> StorageResult<UserAccount> {
        self.modify(&profile.user_id, |existing| {
            let (created_at, wallets) = match existing {
                Some(account) => (account.created_at, account.wallets),
                None => (now, BTreeMap::new()),
            };
            Ok(UserAccount {
                user_id: profile.user_id.clone(),
                email: profile.email.clone(),
                name: profile.name.clone(),
                picture: profile.picture.clone(),
                created_at,
                last_login_at: now,
                wallets,
            })
        })
    }

    /// Merge wallet refs into an existing account.
    pub fn attach_wallets(
        &self,
        user_id: &str,
        wallets: BTreeMap<String, WalletRef>,
    ) -> StorageResult<UserAccount> {
        self.modify(user_id, |existing| {
            let mut account =
                existing.ok_or_else(|| StorageError::NotFound(format!("User {user_id}")))?;
            account.wallets.extend(wallets);
            Ok(account)
        })
    }

    /// Read-modify-write of one account inside a single write transaction.
    fn modify<F>(&self, user_id: &str, f: F) -> StorageResult<UserAccount>
    where
        F: FnOnce(Option<UserAccount>) -> StorageResult<UserAccount>,
    {
        let write_txn = self.db.begin_write()?;
        let account = {
            let mut table = write_txn.open_table(USERS)?;
            let existing = match table.get(user_id)? {
                Some(value) => Some(serde_json::from_slice::<UserAccount>(value.value())?),
                None => None,
            };
            let account = f(existing)?;
            let json = serde_json::to_vec(&account)?;
            table.insert(user_id, json.as_slice())?;
            account
        };
        write_txn.commit()?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_in_memory;
    use chrono::TimeDelta;

    fn repo() -> UserRepository {
        UserRepository::new(open_in_memory().unwrap()).unwrap()
    }

    fn profile(name: &str) -> UserProfile {
        UserProfile {
            user_id: "google-1".to_string(),
            email: "ada@example.com".to_string(),
            name: name.to_string(),
            picture: "https://example.com/ada.png".to_string(),
        }
    }

    fn wallet(id: &str) -> WalletRef {
        WalletRef {
            wallet_id: id.to_string(),
            address: format!("0x{id}"),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn get_unknown_user_is_not_found() {
        assert!(matches!(repo().get("nobody"), Err(StorageError::NotFound(_))));
        assert!(repo().find("nobody").unwrap().is_none());
    }

    #[test]
    fn first_login_creates_account() {
        let repo = repo();
        let now = Utc::now();

        let account = repo.record_login(&profile("Ada"), now).unwrap();

        assert_eq!(account.created_at, now);
        assert_eq!(account.last_login_at, now);
        assert!(account.wallets.is_empty());
        assert_eq!(repo.get("google-1").unwrap(), account);
    }

    #[test]
    fn later_login_refreshes_profile_and_keeps_wallets() {
        let repo = repo();
        let t0 = Utc::now();
        repo.record_login(&profile("Ada"), t0).unwrap();
        repo.attach_wallets(
            "google-1",
            BTreeMap::from([("ARB-SEPOLIA".to_string(), wallet("w1"))]),
        )
        .unwrap();

        let t1 = t0 + TimeDelta::days(1);
        let account = repo.record_login(&profile("Ada Lovelace"), t1).unwrap();

        assert_eq!(account.name, "Ada Lovelace");
        assert_eq!(account.created_at, t0);
        assert_eq!(account.last_login_at, t1);
        assert_eq!(account.wallets["ARB-SEPOLIA"].wallet_id, "w1");
    }

    #[test]
    fn attach_wallets_requires_existing_account() {
        let err = repo()
            .attach_wallets("ghost", BTreeMap::from([("ETH".to_string(), wallet("w"))]))
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
