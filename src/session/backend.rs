// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Record store contract behind the session adapter.
//!
//! A backend only has to offer get-by-key, upsert-by-key and a bulk delete of
//! everything that expired before a given instant. Writes are last-writer-wins
//! per key; the adapter never needs cross-request locking.

use chrono::{DateTime, Utc};

use super::SessionRecord;

/// Failure talking to the record store.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("session record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

macro_rules! unavailable_from {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for BackendError {
                fn from(e: $source) -> Self {
                    BackendError::Unavailable(e.to_string())
                }
            }
        )+
    };
}

unavailable_from!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

pub type BackendResult<T> = Result<T, BackendError>;

/// Key/value store holding [`SessionRecord`]s.
pub trait SessionBackend: Send + Sync {
    /// Fetch a record by id, regardless of expiry.
    fn load(&self, id: &str) -> BackendResult<Option<SessionRecord>>;

    /// Insert or replace the record stored under `record.id`.
    fn upsert(&self, record: &SessionRecord) -> BackendResult<()>;

    /// Remove a record. Removing an unknown id is not an error.
    fn delete(&self, id: &str) -> BackendResult<()>;

    /// Remove every record with `expires_at < now`, returning how many went.
    fn delete_expired(&self, now: DateTime<Utc>) -> BackendResult<usize>;

    /// Cheap round trip used by readiness probes.
    fn health_check(&self) -> BackendResult<()>;
}
