// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Storage
//!
//! A single embedded redb database (pure Rust, ACID) holds both the session
//! tables and the account table. With `DATA_DIR` unset the database lives in
//! memory, which is what development and tests use.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   revenant.redb
//!     sessions        # session id -> session record
//!     session_expiry  # expiry-ordered index for the sweep
//!     users           # external user id -> account record
//! ```

pub mod users;

use std::path::Path;
use std::sync::Arc;

use redb::{backends::InMemoryBackend, Database};

pub use users::{UserAccount, UserRepository, WalletRef};

/// File name of the database under the data directory.
pub const DATABASE_FILE: &str = "revenant.redb";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open (or create) the database file under `data_dir`.
pub fn open_database(data_dir: &Path) -> StorageResult<Arc<Database>> {
    std::fs::create_dir_all(data_dir)?;
    let db = Database::create(data_dir.join(DATABASE_FILE))?;
    Ok(Arc::new(db))
}

/// Open a database that lives only as long as the process.
pub fn open_in_memory() -> StorageResult<Arc<Database>> {
    let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
    Ok(Arc::new(db))
}
