// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session backend on the embedded redb database.
//!
//! ## Table Layout
//!
//! - `sessions`: session id → serialized [`SessionRecord`] (JSON bytes)
//! - `session_expiry`: composite key (expiry_millis_be|id) → id
//!
//! The expiry index is ordered by expiry time, so a sweep is a single range
//! scan from the start of the table up to `now`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{BackendResult, SessionBackend, SessionRecord};

/// Primary table: session id → serialized SessionRecord (JSON bytes).
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");

/// Index: composite key (expiry_millis_be|id) → session id.
const SESSION_EXPIRY: TableDefinition<&[u8], &str> = TableDefinition::new("session_expiry");

/// Milliseconds since the epoch, clamped at zero so big-endian bytes sort in
/// time order.
fn expiry_millis(at: DateTime<Utc>) -> u64 {
    at.timestamp_millis().max(0) as u64
}

/// Build the expiry index key for a record.
fn make_expiry_key(expires_at: DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + id.len());
    key.extend_from_slice(&expiry_millis(expires_at).to_be_bytes());
    key.extend_from_slice(id.as_bytes());
    key
}

/// Session store persisted in redb.
pub struct RedbSessionBackend {
    db: Arc<Database>,
}

impl RedbSessionBackend {
    /// Wrap a shared database, creating the session tables if needed.
    pub fn new(db: Arc<Database>) -> BackendResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS)?;
            let _ = write_txn.open_table(SESSION_EXPIRY)?;
        }
        write_txn.commit()?;
        Ok(Self { db })
    }
}

impl SessionBackend for RedbSessionBackend {
    fn load(&self, id: &str) -> BackendResult<Option<SessionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn upsert(&self, record: &SessionRecord) -> BackendResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let mut expiry = write_txn.open_table(SESSION_EXPIRY)?;

            let previous = match sessions.insert(record.id.as_str(), json.as_slice())? {
                Some(old) => Some(serde_json::from_slice::<SessionRecord>(old.value())?),
                None => None,
            };
            if let Some(previous) = previous {
                let stale = make_expiry_key(previous.expires_at, &previous.id);
                expiry.remove(stale.as_slice())?;
            }

            let key = make_expiry_key(record.expires_at, &record.id);
            expiry.insert(key.as_slice(), record.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete(&self, id: &str) -> BackendResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let mut expiry = write_txn.open_table(SESSION_EXPIRY)?;

            let removed = match sessions.remove(id)? {
                Some(old) => Some(serde_json::from_slice::<SessionRecord>(old.value())?),
                None => None,
            };
            if let Some(removed) = removed {
                let key = make_expiry_key(removed.expires_at, &removed.id);
                expiry.remove(key.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> BackendResult<usize> {
        // Index keys carry whole milliseconds, so the scan includes the
        // millisecond of `now` and the re-check below decides.
        let upper = (expiry_millis(now) + 1).to_be_bytes();
        let mut removed = 0;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(SESSIONS)?;
            let mut expiry = write_txn.open_table(SESSION_EXPIRY)?;

            let mut candidates = Vec::new();
            for entry in expiry.range(..upper.as_slice())? {
                let (key, id) = entry?;
                candidates.push((key.value().to_vec(), id.value().to_string()));
            }

            for (key, id) in candidates {
                // Re-check inside the write transaction: only drop the record
                // if the stored copy is still past its expiry.
                let stored = match sessions.get(id.as_str())? {
                    Some(value) => Some(serde_json::from_slice::<SessionRecord>(value.value())?),
                    None => None,
                };
                match stored {
                    Some(record) if record.expires_at < now => {
                        expiry.remove(key.as_slice())?;
                        sessions.remove(id.as_str())?;
                        removed += 1;
                    }
                    Some(_) => {}
                    // Index entry without a record.
                    None => {
                        expiry.remove(key.as_slice())?;
                    }
                }
            }
        }
        write_txn.commit()?;

        Ok(removed)
    }

    fn health_check(&self) -> BackendResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(SESSIONS)?;
        Ok(())
    }
}
