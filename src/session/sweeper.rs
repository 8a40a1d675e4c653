// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Sweeper
//!
//! Background task that periodically removes expired session records.
//! Request handling never deletes expired records on its own; it only
//! ignores them, so without the sweep they would accumulate.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SessionStore;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Session sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep. Failures are logged; the next tick retries.
    fn sweep_step(&self) -> usize {
        match self.store.sweep_expired() {
            Ok(0) => {
                debug!("Session sweep: nothing expired");
                0
            }
            Ok(removed) => {
                info!(removed, "Session sweep: removed expired sessions");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Session sweep failed; will retry on next tick");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        tests::UnavailableBackend, MemorySessionBackend, SessionBackend, SessionRecord,
        SessionSettings,
    };
    use chrono::{TimeDelta, Utc};

    fn seeded_store() -> (Arc<SessionStore>, Arc<MemorySessionBackend>) {
        let backend = Arc::new(MemorySessionBackend::new());
        let now = Utc::now();
        for (id, offset) in [("gone", -5), ("kept", 60)] {
            let mut data = crate::session::SessionData::new();
            data.insert("user_id".to_string(), serde_json::json!(id));
            backend
                .upsert(&SessionRecord {
                    id: id.to_string(),
                    data,
                    expires_at: now + TimeDelta::minutes(offset),
                })
                .unwrap();
        }
        let store = Arc::new(SessionStore::new(backend.clone(), SessionSettings::default()));
        (store, backend)
    }

    #[test]
    fn sweep_step_removes_expired_records() {
        let (store, backend) = seeded_store();
        let sweeper = SessionSweeper::new(store);

        assert_eq!(sweeper.sweep_step(), 1);
        assert!(backend.load("gone").unwrap().is_none());
        assert!(backend.load("kept").unwrap().is_some());
        assert_eq!(sweeper.sweep_step(), 0);
    }

    #[test]
    fn sweep_step_survives_store_failure() {
        let store = Arc::new(SessionStore::new(
            Arc::new(UnavailableBackend),
            SessionSettings::default(),
        ));
        assert_eq!(SessionSweeper::new(store).sweep_step(), 0);
    }

    #[tokio::test]
    async fn run_sweeps_then_stops_on_cancel() {
        let (store, backend) = seeded_store();
        let shutdown = CancellationToken::new();
        let sweeper = SessionSweeper::new(store).with_interval(Duration::from_millis(10));

        let task = tokio::spawn(sweeper.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert!(backend.load("gone").unwrap().is_none());
        assert_eq!(backend.len(), 1);
    }
}
