// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process session backend for development and tests.
//!
//! Records live only as long as the process; use the redb backend when
//! sessions must survive restarts or be shared between workers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use super::{BackendError, BackendResult, SessionBackend, SessionRecord};

#[derive(Debug, Default)]
pub struct MemorySessionBackend {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, live or not.
    pub fn len(&self) -> usize {
        self.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> BackendResult<RwLockReadGuard<'_, HashMap<String, SessionRecord>>> {
        self.records
            .read()
            .map_err(|_| BackendError::Unavailable("session map lock poisoned".to_string()))
    }

    fn write(&self) -> BackendResult<RwLockWriteGuard<'_, HashMap<String, SessionRecord>>> {
        self.records
            .write()
            .map_err(|_| BackendError::Unavailable("session map lock poisoned".to_string()))
    }
}

impl SessionBackend for MemorySessionBackend {
    fn load(&self, id: &str) -> BackendResult<Option<SessionRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn upsert(&self, record: &SessionRecord) -> BackendResult<()> {
        self.write()?.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, id: &str) -> BackendResult<()> {
        self.write()?.remove(id);
        Ok(())
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> BackendResult<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|_, record| record.expires_at >= now);
        Ok(before - records.len())
    }

    fn health_check(&self) -> BackendResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;
    use chrono::TimeDelta;

    fn record(id: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        let mut data = SessionData::new();
        data.insert("user_id".to_string(), serde_json::json!(id));
        SessionRecord {
            id: id.to_string(),
            data,
            expires_at,
        }
    }

    #[test]
    fn upsert_replaces_existing_record() {
        let backend = MemorySessionBackend::new();
        let now = Utc::now();

        backend.upsert(&record("a", now)).unwrap();
        backend
            .upsert(&record("a", now + TimeDelta::hours(1)))
            .unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(
            backend.load("a").unwrap().unwrap().expires_at,
            now + TimeDelta::hours(1)
        );
    }

    #[test]
    fn delete_unknown_id_is_ok() {
        let backend = MemorySessionBackend::new();
        backend.delete("ghost").unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn delete_expired_keeps_boundary_record() {
        let backend = MemorySessionBackend::new();
        let now = Utc::now();
        backend.upsert(&record("old", now - TimeDelta::seconds(1))).unwrap();
        backend.upsert(&record("edge", now)).unwrap();
        backend.upsert(&record("new", now + TimeDelta::seconds(1))).unwrap();

        assert_eq!(backend.delete_expired(now).unwrap(), 1);
        assert!(backend.load("old").unwrap().is_none());
        assert!(backend.load("edge").unwrap().is_some());
        assert!(backend.load("new").unwrap().is_some());
    }
}
