use super::device::DeviceClass;
use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a generated token. 64 alphanumeric chars carry ~381 bits.
pub const SESSION_TOKEN_LEN: usize = 64;

/// Opaque bearer token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    pub fn generate() -> SessionToken {
        let rng = rand::rng();
        let random_string: String = rng
            .sample_iter(&Alphanumeric)
            .take(SESSION_TOKEN_LEN)
            .map(char::from)
            .collect();
        SessionToken(random_string)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: usize,
    pub user_id: usize,
    pub token: SessionToken,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub device_class: DeviceClass,
}

impl Session {
    /// A session is valid strictly before its expiry instant.
    ///
    /// The store keeps whole seconds and drops the fraction, so a stored
    /// session can expire up to one second before `created_at + ttl` as
    /// computed from a sub-second clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone, Debug)]
pub struct NewSession {
    pub user_id: usize,
    pub token: SessionToken,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub device_class: DeviceClass,
}

pub trait SessionStore: Send + Sync {
    /// Persists a session and returns it with its id.
    /// A token collision or an unknown user fails with an integrity error.
    fn insert_session(&self, session: &NewSession) -> StorageResult<Session>;

    /// Returns Ok(None) if no session holds the token. Expiry is not checked.
    fn get_session_by_token(&self, token: &SessionToken) -> StorageResult<Option<Session>>;

    /// Returns whether a session was actually removed.
    fn delete_session_by_token(&self, token: &SessionToken) -> StorageResult<bool>;

    /// Returns the number of removed sessions.
    fn delete_sessions_for_user(&self, user_id: usize) -> StorageResult<usize>;

    /// Removes every session with `expires_at <= now`, returns how many.
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StorageResult<usize>;

    /// Sessions of a user, newest first.
    fn list_sessions_for_user(&self, user_id: usize) -> StorageResult<Vec<Session>>;
}
