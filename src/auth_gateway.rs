//! Login, logout and request authentication.
//!
//! Every failure seen by callers is the same [`CoreError::Authentication`], so
//! an unknown email, a wrong password and a deactivated account look alike.

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::retry_policy::RetryPolicy;
use crate::session::{Session, SessionManager, SessionToken};
use crate::user::{CredentialHasher, User, UserStore};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

/// Hash verified when the email is unknown, so the response takes as long as
/// for a registered account.
fn dummy_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| {
        let hasher = CredentialHasher::Argon2;
        let salt = hasher.generate_b64_salt();
        hasher
            .hash(b"mentorhub-dummy-password", &salt)
            .unwrap_or_default()
    })
}

pub struct AuthGateway {
    users: Arc<dyn UserStore>,
    sessions: Arc<SessionManager>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl AuthGateway {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<SessionManager>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            retry,
            clock,
        }
    }

    /// Verifies the credentials and opens a new session, replacing any
    /// previous session of the same user.
    pub fn login(
        &self,
        email: &str,
        password: &str,
        user_agent: Option<&str>,
    ) -> CoreResult<(User, Session)> {
        let user = self
            .retry
            .execute("get_user_by_email", || self.users.get_user_by_email(email))?;

        let Some(user) = user else {
            // Result ignored, only the time spent matters
            let _ = CredentialHasher::Argon2.verify(password, dummy_hash());
            debug!("Login attempt for unknown email");
            return Err(CoreError::Authentication);
        };

        let credentials = self.retry.execute("get_password_credentials", || {
            self.users.get_password_credentials(user.id)
        })?;
        let matches = match &credentials {
            Some(credentials) => credentials.verify(password).map_err(|err| {
                CoreError::Internal(format!("Could not verify password: {}", err))
            })?,
            None => {
                let _ = CredentialHasher::Argon2.verify(password, dummy_hash());
                false
            }
        };

        let accepted = matches && user.is_active;
        if credentials.is_some() {
            let now = self.clock.now();
            if let Err(err) = self.retry.execute("record_password_attempt", || {
                self.users.record_password_attempt(user.id, accepted, now)
            }) {
                warn!("Could not record login attempt of user {}: {}", user.id, err);
            }
        }

        if !accepted {
            debug!("Rejected login of user {}", user.id);
            return Err(CoreError::Authentication);
        }

        let session = self.sessions.create_session(user.id, user_agent)?;
        info!("User {} logged in", user.id);
        Ok((user, session))
    }

    /// Ends the session. An unknown or already ended session is fine.
    pub fn logout(&self, token: &SessionToken) -> CoreResult<()> {
        if self.sessions.invalidate(token)? {
            info!("Session logged out");
        }
        Ok(())
    }

    /// Resolves the user behind a bearer token.
    pub fn authenticate_request(&self, token: &SessionToken) -> CoreResult<User> {
        let session = self
            .sessions
            .get_valid_session(token)?
            .ok_or(CoreError::Authentication)?;

        let user = self
            .retry
            .execute("get_user", || self.users.get_user(session.user_id))?;
        match user {
            Some(user) if user.is_active => Ok(user),
            _ => {
                debug!(
                    "Session {} belongs to missing or inactive user {}",
                    session.id, session.user_id
                );
                Err(CoreError::Authentication)
            }
        }
    }
}
