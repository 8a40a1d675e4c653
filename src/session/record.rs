// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted form of a session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application-defined session entries.
pub type SessionData = BTreeMap<String, serde_json::Value>;

/// A session as it is stored in a [`SessionBackend`](super::SessionBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque identifier, also the cookie value.
    pub id: String,
    /// Stored entries. Never empty for a persisted record.
    pub data: SessionData,
    /// The record is dead once this instant has passed.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the record is still usable at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn liveness_is_strict_at_the_boundary() {
        let now = Utc::now();
        let record = SessionRecord {
            id: "abc".to_string(),
            data: SessionData::new(),
            expires_at: now,
        };

        assert!(!record.is_live_at(now));
        assert!(record.is_live_at(now - TimeDelta::seconds(1)));
        assert!(!record.is_live_at(now + TimeDelta::seconds(1)));
    }
}
