//! Signed-in user, persisted in the `loggedInUser` local slot so a restart
//! picks the session back up without asking for credentials again.

use crate::db;
use crate::models::{Role, User};
use crate::store;
use rusqlite::Connection;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const SESSION_SLOT: &str = "loggedInUser";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid Credentials")]
    InvalidCredentials,
    #[error("not signed in")]
    Unauthenticated,
    #[error("role {actual} may not do this")]
    Forbidden { actual: &'static str },
    #[error(transparent)]
    Store(#[from] store::StoreError),
    #[error(transparent)]
    Slot(#[from] anyhow::Error),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidCredentials => "invalid_credentials",
            SessionError::Unauthenticated => "unauthenticated",
            SessionError::Forbidden { .. } => "forbidden",
            SessionError::Store(_) | SessionError::Slot(_) => "db_query_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing has been read from the slot yet.
    #[default]
    Uninitialized,
    /// Slot was empty (or unreadable) at restore time.
    Anonymous,
    Active(User),
    /// Logged out during this run.
    Cleared,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Short lowercase name of the lifecycle state.
    pub fn label(&self) -> &'static str {
        match self.state() {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Anonymous => "anonymous",
            SessionState::Active(_) => "active",
            SessionState::Cleared => "cleared",
        }
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Active(u) => Some(u),
            _ => None,
        }
    }

    /// Loads the persisted user, if any. A slot that no longer parses is
    /// treated as signed out.
    pub fn restore(&mut self, conn: &Connection) {
        self.state = match db::slot_get_json(conn, SESSION_SLOT) {
            Ok(Some(v)) => match serde_json::from_value::<User>(v) {
                Ok(user) => {
                    tracing::info!(user = %user.name, "session restored");
                    SessionState::Active(user)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "discarding unreadable session slot");
                    SessionState::Anonymous
                }
            },
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "session slot unreadable");
                SessionState::Anonymous
            }
        };
    }

    pub fn login(
        &mut self,
        conn: &Connection,
        name: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let user: Option<User> = store::get_unique(conn, "Name", name)?;
        let Some(user) = user else {
            tracing::info!(user = %name, "login rejected");
            return Err(SessionError::InvalidCredentials);
        };
        let matches: bool = user.password.as_bytes().ct_eq(password.as_bytes()).into();
        if !matches {
            tracing::info!(user = %name, "login rejected");
            return Err(SessionError::InvalidCredentials);
        }

        let slot = serde_json::to_value(&user).map_err(anyhow::Error::from)?;
        db::slot_set_json(conn, SESSION_SLOT, &slot)?;
        tracing::info!(user = %user.name, role = user.role.as_str(), "login");
        self.state = SessionState::Active(user.clone());
        Ok(user)
    }

    pub fn logout(&mut self, conn: &Connection) -> Result<(), SessionError> {
        db::slot_remove(conn, SESSION_SLOT)?;
        if let Some(u) = self.user() {
            tracing::info!(user = %u.name, "logout");
        }
        self.state = SessionState::Cleared;
        Ok(())
    }

    /// The active user when their role is one of `allowed`.
    pub fn require(&self, allowed: &[Role]) -> Result<&User, SessionError> {
        let user = self.user().ok_or(SessionError::Unauthenticated)?;
        if !allowed.contains(&user.role) {
            return Err(SessionError::Forbidden {
                actual: user.role.as_str(),
            });
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn seeded() -> Connection {
        let conn = db::open_in_memory().expect("open");
        seed::seed_defaults(&conn).expect("seed");
        conn
    }

    #[test]
    fn lifecycle_login_restore_logout() {
        let conn = seeded();
        let mut s = Session::default();
        assert_eq!(s.state(), &SessionState::Uninitialized);
        s.restore(&conn);
        assert_eq!(s.state(), &SessionState::Anonymous);

        let u = s.login(&conn, "Staff1", "staff123").expect("login");
        assert_eq!(u.role, Role::Staff);

        let mut next_run = Session::default();
        next_run.restore(&conn);
        assert_eq!(next_run.user().map(|u| u.name.as_str()), Some("Staff1"));

        next_run.logout(&conn).expect("logout");
        assert_eq!(next_run.state(), &SessionState::Cleared);
        assert_eq!(next_run.label(), "cleared");

        let mut third = Session::default();
        third.restore(&conn);
        assert_eq!(third.state(), &SessionState::Anonymous);
    }

    #[test]
    fn bad_credentials_leave_session_untouched() {
        let conn = seeded();
        let mut s = Session::default();
        s.restore(&conn);
        assert!(matches!(
            s.login(&conn, "Admin1", "wrong"),
            Err(SessionError::InvalidCredentials)
        ));
        assert!(matches!(
            s.login(&conn, "Nobody", "admin123"),
            Err(SessionError::InvalidCredentials)
        ));
        assert_eq!(s.state(), &SessionState::Anonymous);
        assert_eq!(db::slot_get_json(&conn, SESSION_SLOT).expect("slot"), None);
    }

    #[test]
    fn role_gate() {
        let conn = seeded();
        let mut s = Session::default();
        assert!(matches!(s.require(&[Role::Admin]), Err(SessionError::Unauthenticated)));
        s.login(&conn, "Staff1", "staff123").expect("login");
        assert!(s.require(&[Role::Admin, Role::Staff]).is_ok());
        let err = s.require(&[Role::Admin]).unwrap_err();
        assert_eq!(err.code(), "forbidden");
    }

    #[test]
    fn corrupt_slot_is_ignored() {
        let conn = seeded();
        db::slot_set_json(&conn, SESSION_SLOT, &serde_json::json!({ "name": 7 })).expect("set");
        let mut s = Session::default();
        s.restore(&conn);
        assert_eq!(s.state(), &SessionState::Anonymous);
    }
}
