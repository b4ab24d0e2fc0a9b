// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Signed-in session state. One [`SessionService`] owns the persisted copy;
//! everything else reads through a cloned [`SessionHandle`].

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock};
use time::OffsetDateTime;

use crate::{CompanyId, UserId};

/// Local-storage key the session is persisted under.
pub const SESSION_KEY: &str = "employer_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub signed_in_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn parse(raw: &str) -> Result<Self> {
        let session: Self = serde_json::from_str(raw).context("decode stored session")?;
        if session.token.trim().is_empty() {
            bail!("stored session has an empty token");
        }
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("encode session")
    }

    pub fn display_name(&self) -> &str {
        if self.user.name.trim().is_empty() {
            &self.user.email
        } else {
            &self.user.name
        }
    }
}

/// Persistence adapter for the raw session JSON.
pub trait SessionStore {
    fn load_session(&self) -> Result<Option<String>>;
    fn save_session(&self, raw: &str) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        match self.raw.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load_session(&self) -> Result<Option<String>> {
        Ok(self.slot().clone())
    }

    fn save_session(&self, raw: &str) -> Result<()> {
        *self.slot() = Some(raw.to_owned());
        Ok(())
    }

    fn clear_session(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}

/// Read side of the process-wide auth slice.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    slot: Arc<RwLock<Option<Session>>>,
}

impl SessionHandle {
    pub fn current(&self) -> Option<Session> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|session| session.token)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }

    fn replace(&self, session: Option<Session>) {
        match self.slot.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}

pub struct SessionService<S: SessionStore> {
    store: S,
    handle: SessionHandle,
}

impl<S: SessionStore> SessionService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            handle: SessionHandle::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Mirrors the persisted session into memory. A malformed record is
    /// removed and treated as signed out.
    pub fn restore(&self) -> Result<Option<Session>> {
        let Some(raw) = self.store.load_session()? else {
            self.handle.replace(None);
            return Ok(None);
        };

        match Session::parse(&raw) {
            Ok(session) => {
                tracing::info!(user = %session.user.id, "restored session");
                self.handle.replace(Some(session.clone()));
                Ok(Some(session))
            }
            Err(error) => {
                tracing::warn!("discarding stored session: {error:#}");
                self.store.clear_session()?;
                self.handle.replace(None);
                Ok(None)
            }
        }
    }

    pub fn get(&self) -> Option<Session> {
        self.handle.current()
    }

    pub fn set(&self, session: Session) -> Result<()> {
        self.store.save_session(&session.to_json()?)?;
        self.handle.replace(Some(session));
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.store.clear_session()?;
        self.handle.replace(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemorySessionStore, Session, SessionService, SessionStore, SessionUser};
    use crate::UserId;
    use anyhow::Result;

    fn sample_session() -> Session {
        Session {
            token: "tok-123".to_owned(),
            user: SessionUser {
                id: UserId::new(4),
                name: "Nadia Clinic".to_owned(),
                email: "hr@clinic.example".to_owned(),
                company_id: None,
            },
            signed_in_at: None,
        }
    }

    #[test]
    fn set_persists_and_updates_handle() -> Result<()> {
        let service = SessionService::new(MemorySessionStore::new());
        let handle = service.handle();
        assert!(!handle.is_signed_in());

        service.set(sample_session())?;
        assert_eq!(handle.token().as_deref(), Some("tok-123"));
        let raw = service.store().load_session()?.expect("persisted session");
        assert_eq!(Session::parse(&raw)?, sample_session());
        Ok(())
    }

    #[test]
    fn restore_mirrors_persisted_session() -> Result<()> {
        let raw = sample_session().to_json()?;
        let service = SessionService::new(MemorySessionStore::with_raw(raw));
        let restored = service.restore()?;
        assert_eq!(restored, Some(sample_session()));
        assert_eq!(service.get(), Some(sample_session()));
        Ok(())
    }

    #[test]
    fn malformed_session_is_cleared_and_treated_as_absent() -> Result<()> {
        let service = SessionService::new(MemorySessionStore::with_raw("{not json"));
        assert_eq!(service.restore()?, None);
        assert!(!service.handle().is_signed_in());
        assert_eq!(service.store().load_session()?, None);
        Ok(())
    }

    #[test]
    fn empty_token_is_rejected() {
        let error = Session::parse(r#"{"token":"  ","user":{"id":1}}"#)
            .expect_err("empty token should fail");
        assert!(error.to_string().contains("empty token"));
    }

    #[test]
    fn clear_signs_out() -> Result<()> {
        let service = SessionService::new(MemorySessionStore::new());
        service.set(sample_session())?;
        service.clear()?;
        assert_eq!(service.get(), None);
        assert_eq!(service.store().load_session()?, None);
        Ok(())
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let mut session = sample_session();
        session.user.name = String::new();
        assert_eq!(session.display_name(), "hr@clinic.example");
    }
}
