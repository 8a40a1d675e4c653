// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Server-side Sessions
//!
//! Maps an opaque identifier, carried in a single cookie, to a small mapping
//! of per-visitor data stored in a [`SessionBackend`].
//!
//! ## Lifecycle
//!
//! 1. [`SessionStore::open`] runs at the start of every request. A missing,
//!    unknown or expired cookie yields a new empty session with a fresh id.
//!    Opening never writes.
//! 2. Handlers mutate the session through [`SessionHandle`].
//! 3. [`SessionStore::save`] runs on the way out. Empty sessions are not
//!    stored and their cookie is cleared; anything else is upserted with
//!    `expires_at = now + lifetime` and the cookie is re-issued.
//! 4. [`SessionSweeper`] periodically deletes records that have expired.
//!
//! ## Failure Handling
//!
//! - Store unreachable while opening: the request continues anonymously.
//! - Store unreachable while saving: the request fails with a 500.
//! - Sweep failures are logged and retried on the next tick.

pub mod backend;
pub mod cookies;
pub mod layer;
pub mod memory;
pub mod record;
pub mod redb_backend;
pub mod sweeper;

use std::sync::Arc;

use ::cookie::{Cookie, SameSite};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

pub use backend::{BackendError, BackendResult, SessionBackend};
pub use layer::{session_middleware, SessionHandle};
pub use memory::MemorySessionBackend;
pub use record::{SessionData, SessionRecord};
pub use redb_backend::RedbSessionBackend;
pub use sweeper::{SessionSweeper, DEFAULT_SWEEP_INTERVAL};

/// Session key holding the authenticated user's external id.
pub const USER_ID_KEY: &str = "user_id";

/// Default session lifetime (31 days).
pub const DEFAULT_LIFETIME: TimeDelta = TimeDelta::days(31);

/// Cookie values longer than this cannot be ids we issued.
const MAX_SESSION_ID_LEN: usize = 128;

/// Cookie and expiry settings for sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub lifetime: TimeDelta,
    pub cookie_domain: Option<String>,
    pub cookie_path: String,
    pub cookie_http_only: bool,
    pub cookie_secure: bool,
    pub cookie_same_site: Option<SameSite>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "session".to_string(),
            lifetime: DEFAULT_LIFETIME,
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_http_only: true,
            cookie_secure: false,
            cookie_same_site: Some(SameSite::Lax),
        }
    }
}

/// How an opened session came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// No cookie was presented.
    Fresh,
    /// A live record was found and loaded.
    Restored,
    /// The cookie pointed at a record past its expiry.
    Expired,
    /// The cookie pointed at nothing.
    Missing,
    /// The store could not be read.
    Degraded,
}

/// Per-visitor state for the duration of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    data: SessionData,
    origin: SessionOrigin,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A new, empty session with a fresh id.
    pub fn new() -> Self {
        Self::fresh(SessionOrigin::Fresh)
    }

    fn fresh(origin: SessionOrigin) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: SessionData::new(),
            origin,
        }
    }

    fn restored(record: SessionRecord) -> Self {
        Self {
            id: record.id,
            data: record.data,
            origin: SessionOrigin::Restored,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> SessionOrigin {
        self.origin
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Read an entry, returning `None` if it is missing or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), serde_json::Error> {
        self.data.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn user_id(&self) -> Option<String> {
        self.get(USER_ID_KEY)
    }

    pub fn set_user_id(&mut self, user_id: &str) {
        self.data.insert(
            USER_ID_KEY.to_string(),
            serde_json::Value::String(user_id.to_string()),
        );
    }
}

/// What the response must do with the session cookie.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieInstruction {
    Set(Cookie<'static>),
    Remove(Cookie<'static>),
}

impl CookieInstruction {
    pub fn cookie(&self) -> &Cookie<'static> {
        match self {
            CookieInstruction::Set(cookie) | CookieInstruction::Remove(cookie) => cookie,
        }
    }

    /// Value for a `Set-Cookie` header.
    pub fn header_value(&self) -> String {
        self.cookie().to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to persist session: {0}")]
    StoreUnavailable(#[from] BackendError),
}

/// Session adapter over a [`SessionBackend`].
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    settings: SessionSettings,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>, settings: SessionSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn health_check(&self) -> BackendResult<()> {
        self.backend.health_check()
    }

    /// Load the session named by `cookie_value`, or start a new one.
    pub fn open(&self, cookie_value: Option<&str>) -> Session {
        self.open_at(cookie_value, Utc::now())
    }

    pub fn open_at(&self, cookie_value: Option<&str>, now: DateTime<Utc>) -> Session {
        let Some(id) = cookie_value.filter(|value| !value.is_empty()) else {
            return Session::fresh(SessionOrigin::Fresh);
        };

        if id.len() > MAX_SESSION_ID_LEN {
            debug!(len = id.len(), "Ignoring oversized session cookie");
            return Session::fresh(SessionOrigin::Missing);
        }

        match self.backend.load(id) {
            Ok(Some(record)) if record.is_live_at(now) => Session::restored(record),
            Ok(Some(record)) => {
                debug!(expired_at = %record.expires_at, "Session expired; starting a new one");
                Session::fresh(SessionOrigin::Expired)
            }
            Ok(None) => {
                debug!("Unknown session id; starting a new one");
                Session::fresh(SessionOrigin::Missing)
            }
            Err(e) => {
                warn!(error = %e, "Session store unreadable; continuing anonymously");
                Session::fresh(SessionOrigin::Degraded)
            }
        }
    }

    /// Persist the session and say what to do with the cookie.
    pub fn save(&self, session: &Session) -> Result<CookieInstruction, SessionError> {
        self.save_at(session, Utc::now())
    }

    pub fn save_at(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> Result<CookieInstruction, SessionError> {
        if session.is_empty() {
            // Only a restored session can have a record under its id.
            if session.origin() == SessionOrigin::Restored {
                self.backend.delete(session.id())?;
            }
            return Ok(CookieInstruction::Remove(cookies::removal_cookie(
                &self.settings,
            )));
        }

        let expires_at = now + self.settings.lifetime;
        let record = SessionRecord {
            id: session.id().to_string(),
            data: session.data().clone(),
            expires_at,
        };
        self.backend.upsert(&record)?;

        Ok(CookieInstruction::Set(cookies::session_cookie(
            &self.settings,
            session.id(),
            expires_at,
        )))
    }

    /// Delete every record that expired before now.
    pub fn sweep_expired(&self) -> Result<usize, SessionError> {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<usize, SessionError> {
        Ok(self.backend.delete_expired(now)?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend whose every call fails, standing in for an unreachable store.
    pub(crate) struct UnavailableBackend;

    impl SessionBackend for UnavailableBackend {
        fn load(&self, _id: &str) -> BackendResult<Option<SessionRecord>> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }

        fn upsert(&self, _record: &SessionRecord) -> BackendResult<()> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }

        fn delete(&self, _id: &str) -> BackendResult<()> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }

        fn delete_expired(&self, _now: DateTime<Utc>) -> BackendResult<usize> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }

        fn health_check(&self) -> BackendResult<()> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }
    }

    fn store_with(backend: Arc<MemorySessionBackend>, lifetime: TimeDelta) -> SessionStore {
        SessionStore::new(
            backend,
            SessionSettings {
                lifetime,
                ..SessionSettings::default()
            },
        )
    }

    fn cookie_value(instruction: &CookieInstruction) -> String {
        instruction.cookie().value().to_string()
    }

    #[test]
    fn open_without_cookie_is_fresh_and_unsaved() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), DEFAULT_LIFETIME);

        let session = store.open(None);

        assert!(session.is_empty());
        assert_eq!(session.origin(), SessionOrigin::Fresh);
        assert!(!session.id().is_empty());
        assert!(backend.is_empty());
    }

    #[test]
    fn fresh_sessions_get_distinct_ids() {
        let store = store_with(Arc::new(MemorySessionBackend::new()), DEFAULT_LIFETIME);
        assert_ne!(store.open(None).id(), store.open(None).id());
    }

    #[test]
    fn save_then_open_round_trips_data() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend, DEFAULT_LIFETIME);

        let mut session = store.open(None);
        session.set_user_id("google-42");
        session.insert("visits", 3).unwrap();
        let instruction = store.save(&session).unwrap();

        assert!(matches!(instruction, CookieInstruction::Set(_)));
        let cookie = cookie_value(&instruction);
        assert_eq!(cookie, session.id());

        let reopened = store.open(Some(&cookie));
        assert_eq!(reopened.origin(), SessionOrigin::Restored);
        assert_eq!(reopened.id(), session.id());
        assert_eq!(reopened.data(), session.data());
        assert_eq!(reopened.user_id().as_deref(), Some("google-42"));
        assert_eq!(reopened.get::<u32>("visits"), Some(3));
    }

    #[test]
    fn empty_session_is_not_persisted_and_cookie_is_removed() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), DEFAULT_LIFETIME);

        let session = store.open(None);
        let instruction = store.save(&session).unwrap();

        assert!(matches!(instruction, CookieInstruction::Remove(_)));
        assert_eq!(instruction.cookie().name(), "session");
        assert!(backend.is_empty());
    }

    #[test]
    fn emptied_session_deletes_its_record() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), DEFAULT_LIFETIME);

        let mut session = store.open(None);
        session.set_user_id("google-42");
        let cookie = cookie_value(&store.save(&session).unwrap());
        assert_eq!(backend.len(), 1);

        let mut reopened = store.open(Some(&cookie));
        reopened.remove(USER_ID_KEY);
        let instruction = store.save(&reopened).unwrap();

        assert!(matches!(instruction, CookieInstruction::Remove(_)));
        assert!(backend.is_empty());
        assert_eq!(store.open(Some(&cookie)).origin(), SessionOrigin::Missing);
    }

    #[test]
    fn unknown_cookie_yields_new_empty_session() {
        let store = store_with(Arc::new(MemorySessionBackend::new()), DEFAULT_LIFETIME);

        let session = store.open(Some("not-a-session"));

        assert!(session.is_empty());
        assert_eq!(session.origin(), SessionOrigin::Missing);
        assert_ne!(session.id(), "not-a-session");
    }

    #[test]
    fn oversized_cookie_is_treated_as_unknown() {
        let store = SessionStore::new(Arc::new(UnavailableBackend), SessionSettings::default());
        let huge = "x".repeat(MAX_SESSION_ID_LEN + 1);

        // Never reaches the backend, so it is not reported as degraded.
        assert_eq!(store.open(Some(&huge)).origin(), SessionOrigin::Missing);
    }

    #[test]
    fn repeated_saves_overwrite_the_same_record() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), DEFAULT_LIFETIME);

        let mut session = store.open(None);
        session.insert("step", 1).unwrap();
        store.save(&session).unwrap();
        session.insert("step", 2).unwrap();
        store.save(&session).unwrap();

        assert_eq!(backend.len(), 1);
        let stored = backend.load(session.id()).unwrap().unwrap();
        assert_eq!(stored.data.get("step"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn one_hour_lifetime_scenario() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend, TimeDelta::hours(1));
        let t0 = Utc::now();

        let mut session = store.open_at(None, t0);
        session.set_user_id("google-42");
        let cookie = cookie_value(&store.save_at(&session, t0).unwrap());

        let half_hour = store.open_at(Some(&cookie), t0 + TimeDelta::minutes(30));
        assert_eq!(half_hour.user_id().as_deref(), Some("google-42"));

        let too_late = store.open_at(Some(&cookie), t0 + TimeDelta::minutes(61));
        assert!(too_late.is_empty());
        assert_eq!(too_late.origin(), SessionOrigin::Expired);
        assert_ne!(too_late.id(), cookie);
    }

    #[test]
    fn open_never_extends_lifetime() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), TimeDelta::hours(1));
        let t0 = Utc::now();

        let mut session = store.open_at(None, t0);
        session.set_user_id("google-42");
        let cookie = cookie_value(&store.save_at(&session, t0).unwrap());

        store.open_at(Some(&cookie), t0 + TimeDelta::minutes(50));

        let stored = backend.load(&cookie).unwrap().unwrap();
        assert_eq!(stored.expires_at, t0 + TimeDelta::hours(1));
    }

    #[test]
    fn save_sets_expiry_from_lifetime() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), TimeDelta::hours(1));
        let t0 = Utc::now();

        let mut session = store.open_at(None, t0);
        session.set_user_id("google-42");
        let instruction = store.save_at(&session, t0).unwrap();

        let stored = backend.load(session.id()).unwrap().unwrap();
        assert_eq!(stored.expires_at, t0 + TimeDelta::hours(1));
        assert_eq!(
            instruction
                .cookie()
                .expires_datetime()
                .map(|at| at.unix_timestamp()),
            Some(stored.expires_at.timestamp())
        );
    }

    #[test]
    fn sweep_removes_only_expired_records() {
        let backend = Arc::new(MemorySessionBackend::new());
        let store = store_with(backend.clone(), TimeDelta::hours(1));
        let t0 = Utc::now();

        let mut early = store.open_at(None, t0);
        early.set_user_id("early");
        store.save_at(&early, t0).unwrap();

        let mut late = store.open_at(None, t0);
        late.set_user_id("late");
        store.save_at(&late, t0 + TimeDelta::hours(2)).unwrap();

        let removed = store.sweep_expired_at(t0 + TimeDelta::minutes(90)).unwrap();

        assert_eq!(removed, 1);
        assert!(backend.load(early.id()).unwrap().is_none());
        assert!(backend.load(late.id()).unwrap().is_some());
    }

    #[test]
    fn unavailable_store_degrades_open_but_fails_save() {
        let store = SessionStore::new(Arc::new(UnavailableBackend), SessionSettings::default());

        let mut session = store.open(Some("some-session"));
        assert!(session.is_empty());
        assert_eq!(session.origin(), SessionOrigin::Degraded);

        session.set_user_id("google-42");
        assert!(matches!(
            store.save(&session),
            Err(SessionError::StoreUnavailable(_))
        ));
        assert!(store.sweep_expired().is_err());
    }

    #[test]
    fn get_with_wrong_shape_is_none() {
        let mut session = Session::fresh(SessionOrigin::Fresh);
        session.insert("count", "three").unwrap();
        assert_eq!(session.get::<u32>("count"), None);
        assert_eq!(session.get::<String>("count").as_deref(), Some("three"));
    }
}
