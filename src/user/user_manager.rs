use super::{
    auth::PasswordCredentials, permissions::UserRole, user_models::User, UserStore,
};
use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};
use crate::retry_policy::RetryPolicy;
use std::sync::Arc;
use tracing::info;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Account administration: creation, passwords, roles and activation.
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>, retry: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            user_store,
            retry,
            clock,
        }
    }

    fn validate_email(email: &str) -> CoreResult<()> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CoreError::Validation("The email cannot be empty.".to_string()));
        }
        if !email.contains('@') {
            return Err(CoreError::Validation(format!("Invalid email {}.", email)));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> CoreResult<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::Validation(format!(
                "The password must be at least {} characters long.",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    fn hash_password(&self, user_id: usize, password: &str) -> CoreResult<PasswordCredentials> {
        PasswordCredentials::create(user_id, password, self.clock.now())
            .map_err(|err| CoreError::Internal(format!("Could not hash password: {}", err)))
    }

    fn require_user(&self, email: &str) -> CoreResult<User> {
        self.get_user_by_email(email)?
            .ok_or_else(|| CoreError::NotFound(format!("User {} not found.", email.trim())))
    }

    /// Creates an account with password credentials and returns it.
    pub fn add_user(&self, email: &str, password: &str, role: UserRole) -> CoreResult<User> {
        Self::validate_email(email)?;
        Self::validate_password(password)?;

        if self.get_user_by_email(email)?.is_some() {
            return Err(CoreError::Conflict(format!(
                "User {} already exists.",
                email.trim()
            )));
        }

        let user_id = self
            .retry
            .execute("create_user", || self.user_store.create_user(email, role))?;
        let credentials = self.hash_password(user_id, password)?;
        self.retry.execute("upsert_password_credentials", || {
            self.user_store.upsert_password_credentials(&credentials)
        })?;
        info!("Added user {} with role {}", user_id, role.as_str());

        self.retry
            .execute("get_user", || self.user_store.get_user(user_id))?
            .ok_or_else(|| CoreError::Internal(format!("User {} vanished after creation", user_id)))
    }

    pub fn set_password(&self, email: &str, password: &str) -> CoreResult<()> {
        Self::validate_password(password)?;
        let user = self.require_user(email)?;
        let credentials = self.hash_password(user.id, password)?;
        self.retry.execute("upsert_password_credentials", || {
            self.user_store.upsert_password_credentials(&credentials)
        })?;
        info!("Password updated for user {}", user.id);
        Ok(())
    }

    pub fn set_role(&self, email: &str, role: UserRole) -> CoreResult<User> {
        let user = self.require_user(email)?;
        self.retry
            .execute("set_user_role", || self.user_store.set_user_role(user.id, role))?;
        info!("User {} is now {}", user.id, role.as_str());
        Ok(User { role, ..user })
    }

    pub fn set_active(&self, email: &str, is_active: bool) -> CoreResult<User> {
        let user = self.require_user(email)?;
        self.retry.execute("set_user_active", || {
            self.user_store.set_user_active(user.id, is_active)
        })?;
        info!("User {} active flag set to {}", user.id, is_active);
        Ok(User { is_active, ..user })
    }

    pub fn get_user(&self, user_id: usize) -> CoreResult<Option<User>> {
        Ok(self
            .retry
            .execute("get_user", || self.user_store.get_user(user_id))?)
    }

    pub fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        Ok(self
            .retry
            .execute("get_user_by_email", || self.user_store.get_user_by_email(email))?)
    }

    pub fn list_users(&self) -> CoreResult<Vec<User>> {
        Ok(self
            .retry
            .execute("get_all_users", || self.user_store.get_all_users())?)
    }

    /// Verifies a password without creating a session.
    /// Unknown users and users without a password simply don't match.
    pub fn check_password(&self, email: &str, password: &str) -> CoreResult<bool> {
        let Some(user) = self.get_user_by_email(email)? else {
            return Ok(false);
        };
        let Some(credentials) = self.retry.execute("get_password_credentials", || {
            self.user_store.get_password_credentials(user.id)
        })?
        else {
            return Ok(false);
        };
        credentials
            .verify(password)
            .map_err(|err| CoreError::Internal(format!("Could not verify password: {}", err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::sqlite_persistence::SqliteStore;
    use tempfile::TempDir;

    fn create_manager() -> (UserManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("test.db")).unwrap();
        let manager = UserManager::new(Arc::new(store), RetryPolicy::default(), Arc::new(SystemClock));
        (manager, temp_dir)
    }

    #[test]
    fn adds_user_with_password() {
        let (manager, _temp_dir) = create_manager();

        let user = manager
            .add_user("Mentor@Example.com", "correct horse", UserRole::Admin)
            .unwrap();
        assert_eq!(user.email, "mentor@example.com");
        assert_eq!(user.role, UserRole::Admin);
        assert!(user.is_active);

        assert!(manager.check_password("mentor@example.com", "correct horse").unwrap());
        assert!(!manager.check_password("mentor@example.com", "wrong horse").unwrap());
        assert!(!manager.check_password("nobody@example.com", "correct horse").unwrap());
    }

    #[test]
    fn rejects_invalid_input() {
        let (manager, _temp_dir) = create_manager();

        let err = manager.add_user("", "long enough", UserRole::Regular).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let err = manager
            .add_user("not-an-email", "long enough", UserRole::Regular)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        let err = manager.add_user("a@x.com", "short", UserRole::Regular).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(manager.list_users().unwrap().is_empty());
    }

    #[test]
    fn rejects_duplicate_email() {
        let (manager, _temp_dir) = create_manager();
        manager.add_user("a@x.com", "long enough", UserRole::Regular).unwrap();

        let err = manager
            .add_user("A@X.COM", "long enough", UserRole::Regular)
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn updates_password_role_and_activation() {
        let (manager, _temp_dir) = create_manager();
        manager.add_user("a@x.com", "first password", UserRole::Regular).unwrap();

        manager.set_password("a@x.com", "second password").unwrap();
        assert!(manager.check_password("a@x.com", "second password").unwrap());
        assert!(!manager.check_password("a@x.com", "first password").unwrap());

        let user = manager.set_role("a@x.com", UserRole::Admin).unwrap();
        assert_eq!(user.role, UserRole::Admin);
        let user = manager.set_active("a@x.com", false).unwrap();
        assert!(!user.is_active);

        let stored = manager.get_user_by_email("a@x.com").unwrap().unwrap();
        assert_eq!(stored.role, UserRole::Admin);
        assert!(!stored.is_active);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let (manager, _temp_dir) = create_manager();
        let err = manager.set_role("ghost@x.com", UserRole::Admin).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        let err = manager.set_password("ghost@x.com", "long enough").unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
