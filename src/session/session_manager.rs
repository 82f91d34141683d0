//! Session lifecycle: issuing, validating, invalidating and sweeping.
//!
//! Every store call goes through the [`RetryPolicy`]. A user holds at most one
//! session, each new login replaces whatever was there before.

use super::device::DeviceClass;
use super::session_store::{NewSession, Session, SessionStore, SessionToken};
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::retry_policy::RetryPolicy;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            retry,
            clock,
            ttl,
        }
    }

    /// Replaces every session of `user_id` with a fresh one.
    pub fn create_session(&self, user_id: usize, user_agent: Option<&str>) -> CoreResult<Session> {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            CoreError::Internal(format!("session ttl {} overflows the expiry time", self.ttl))
        })?;

        let replaced = self.retry.execute("delete_sessions_for_user", || {
            self.store.delete_sessions_for_user(user_id)
        })?;
        if replaced > 0 {
            debug!("Dropped {} previous session(s) of user {}", replaced, user_id);
        }

        let device_class = DeviceClass::classify(user_agent);
        let new_session = NewSession {
            user_id,
            token: SessionToken::generate(),
            created_at: now,
            expires_at,
            device_class,
        };
        let session = self
            .retry
            .execute("insert_session", || self.store.insert_session(&new_session))?;

        info!(
            "Created session {} for user {} ({}), expires at {}",
            session.id,
            user_id,
            device_class.as_str(),
            session.expires_at
        );
        Ok(session)
    }

    /// Returns the session if it exists and has not expired yet.
    /// An expired session is removed on the spot.
    pub fn get_valid_session(&self, token: &SessionToken) -> CoreResult<Option<Session>> {
        let Some(session) = self
            .retry
            .execute("get_session_by_token", || self.store.get_session_by_token(token))?
        else {
            return Ok(None);
        };

        if session.is_expired_at(self.clock.now()) {
            self.retry
                .execute("delete_session_by_token", || self.store.delete_session_by_token(token))?;
            debug!("Session {} of user {} expired", session.id, session.user_id);
            return Ok(None);
        }

        Ok(Some(session))
    }

    /// Idempotent, returns whether a session was actually removed.
    pub fn invalidate(&self, token: &SessionToken) -> CoreResult<bool> {
        let removed = self
            .retry
            .execute("delete_session_by_token", || self.store.delete_session_by_token(token))?;
        if removed {
            debug!("Session invalidated");
        }
        Ok(removed)
    }

    pub fn invalidate_all(&self, user_id: usize) -> CoreResult<usize> {
        let removed = self.retry.execute("delete_sessions_for_user", || {
            self.store.delete_sessions_for_user(user_id)
        })?;
        info!("Invalidated {} session(s) of user {}", removed, user_id);
        Ok(removed)
    }

    pub fn cleanup_expired(&self) -> CoreResult<usize> {
        let now = self.clock.now();
        let removed = self
            .retry
            .execute("delete_expired_sessions", || self.store.delete_expired_sessions(now))?;
        info!("Swept {} expired session(s)", removed);
        Ok(removed)
    }

    pub fn sessions_for_user(&self, user_id: usize) -> CoreResult<Vec<Session>> {
        Ok(self.retry.execute("list_sessions_for_user", || {
            self.store.list_sessions_for_user(user_id)
        })?)
    }
}
