use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::record::{Validate, ValidationError};
use crate::domain::entities::session::{Credential, LoginForm, Role, Session};
use crate::usecase::ports::session::{SessionStorage, StorageError, SESSION_KEY, TOKEN_KEY};

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid email or password. Please check your credentials and try again.")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The signed-in user for this process. Built once at startup from
/// persisted storage and cleared on logout.
pub struct SessionContext {
    storage: Arc<dyn SessionStorage>,
    credentials: Vec<Credential>,
    ttl: Duration,
    current: Option<Session>,
}

impl SessionContext {
    /// Restores a persisted session. Expired or unreadable sessions are
    /// purged from storage.
    pub fn init(
        storage: Arc<dyn SessionStorage>,
        credentials: Vec<Credential>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        let mut context = Self {
            storage,
            credentials,
            ttl,
            current: None,
        };
        context.current = context.restore(now)?;
        Ok(context)
    }

    fn restore(&self, now: DateTime<Utc>) -> Result<Option<Session>, SessionError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let raw = self.storage.get(SESSION_KEY)?;
        let (token, raw) = match (token, raw) {
            (Some(token), Some(raw)) => (token, raw),
            (None, None) => return Ok(None),
            _ => {
                warn!("purging half-written session");
                self.purge()?;
                return Ok(None);
            }
        };

        let session = match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.token.to_string() == token => session,
            Ok(_) => {
                warn!("purging session with mismatched token");
                self.purge()?;
                return Ok(None);
            }
            Err(err) => {
                warn!(error = %err, "purging unreadable session");
                self.purge()?;
                return Ok(None);
            }
        };

        if session.is_expired(now, self.ttl) {
            warn!(email = %session.email, "purging expired session");
            self.purge()?;
            return Ok(None);
        }

        info!(email = %session.email, role = %session.role, "session restored");
        Ok(Some(session))
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Drops the in-memory session too once it has expired.
    pub fn check(&mut self, now: DateTime<Utc>) -> Result<bool, SessionError> {
        let expired = self
            .current
            .as_ref()
            .map(|session| session.is_expired(now, self.ttl));
        match expired {
            Some(true) => {
                warn!("session expired");
                self.logout()?;
                Ok(false)
            }
            Some(false) => Ok(true),
            None => Ok(false),
        }
    }

    pub fn login(&mut self, form: LoginForm, now: DateTime<Utc>) -> Result<Session, SessionError> {
        form.validate()?;

        let email = form.email.trim();
        let known = self
            .credentials
            .iter()
            .any(|credential| {
                credential.email.eq_ignore_ascii_case(email) && credential.password == form.password
            });
        if !known {
            warn!(email, "login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let session = Session {
            token: Uuid::new_v4(),
            email: email.to_string(),
            role: Role::from_email(email),
            login_time: now,
            remember_me: form.remember_me,
        };
        let raw = serde_json::to_string(&session)
            .map_err(|err| StorageError(format!("failed to encode session: {err}")))?;
        self.storage.set(TOKEN_KEY, &session.token.to_string())?;
        self.storage.set(SESSION_KEY, &raw)?;

        info!(
            email = %session.email,
            role = %session.role,
            remember_me = session.remember_me,
            "logged in"
        );
        self.current = Some(session.clone());
        Ok(session)
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(session) = self.current.take() {
            info!(email = %session.email, "logged out");
        }
        self.purge()
    }

    fn purge(&self) -> Result<(), SessionError> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(SESSION_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::session::MemorySessionStorage;

    fn at(raw: &str) -> DateTime<Utc> {
        raw.parse().expect("timestamp should parse")
    }

    fn form(email: &str, password: &str, remember_me: bool) -> LoginForm {
        LoginForm {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        }
    }

    fn context(storage: Arc<MemorySessionStorage>, now: DateTime<Utc>) -> SessionContext {
        SessionContext::init(
            storage,
            Credential::demo_accounts(),
            Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            now,
        )
        .expect("init should succeed")
    }

    #[test]
    fn login_persists_session_and_derives_role() {
        let storage = Arc::new(MemorySessionStorage::default());
        let now = at("2024-03-01T08:00:00Z");
        let mut session = context(Arc::clone(&storage), now);

        let issued = session
            .login(form("manager@erpcrm.com", "manager123", false), now)
            .expect("demo login should succeed");

        assert_eq!(issued.role, Role::Manager);
        assert_eq!(
            storage.get(TOKEN_KEY).expect("get should succeed"),
            Some(issued.token.to_string())
        );
        assert!(session.is_authenticated());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let storage = Arc::new(MemorySessionStorage::default());
        let now = at("2024-03-01T08:00:00Z");
        let mut session = context(storage, now);

        let result = session.login(form("admin@erpcrm.com", "admin999", false), now);

        assert_eq!(result, Err(SessionError::InvalidCredentials));
        assert!(!session.is_authenticated());
    }

    #[test]
    fn restore_keeps_fresh_and_purges_expired_sessions() {
        let storage = Arc::new(MemorySessionStorage::default());
        let login_at = at("2024-03-01T08:00:00Z");
        context(Arc::clone(&storage), login_at)
            .login(form("user@erpcrm.com", "user123", false), login_at)
            .expect("login should succeed");

        let fresh = context(Arc::clone(&storage), login_at + Duration::hours(23));
        assert!(fresh.is_authenticated());

        let stale = context(Arc::clone(&storage), login_at + Duration::hours(25));
        assert!(!stale.is_authenticated());
        assert_eq!(storage.get(SESSION_KEY).expect("get should succeed"), None);
        assert_eq!(storage.get(TOKEN_KEY).expect("get should succeed"), None);
    }

    #[test]
    fn remember_me_survives_past_ttl() {
        let storage = Arc::new(MemorySessionStorage::default());
        let login_at = at("2024-03-01T08:00:00Z");
        context(Arc::clone(&storage), login_at)
            .login(form("admin@erpcrm.com", "admin123", true), login_at)
            .expect("login should succeed");

        let later = context(storage, login_at + Duration::days(10));

        assert_eq!(later.current().map(|s| s.role), Some(Role::Admin));
    }

    #[test]
    fn corrupt_session_is_purged() {
        let storage = Arc::new(MemorySessionStorage::default());
        storage.set(TOKEN_KEY, "abc").expect("set should succeed");
        storage.set(SESSION_KEY, "{not json").expect("set should succeed");

        let session = context(Arc::clone(&storage), at("2024-03-01T08:00:00Z"));

        assert!(!session.is_authenticated());
        assert_eq!(storage.get(TOKEN_KEY).expect("get should succeed"), None);
    }

    #[test]
    fn logout_clears_both_keys() {
        let storage = Arc::new(MemorySessionStorage::default());
        let now = at("2024-03-01T08:00:00Z");
        let mut session = context(Arc::clone(&storage), now);
        session
            .login(form("user@erpcrm.com", "user123", false), now)
            .expect("login should succeed");

        session.logout().expect("logout should succeed");

        assert!(session.current().is_none());
        assert_eq!(storage.get(SESSION_KEY).expect("get should succeed"), None);
    }
}
