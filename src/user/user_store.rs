use super::auth::PasswordCredentials;
use super::permissions::UserRole;
use super::user_models::User;
use crate::error::StorageResult;
use chrono::{DateTime, Utc};

pub trait UserStore: Send + Sync {
    /// Creates a new user and returns its id.
    /// Fails with an integrity error if the email is already taken.
    fn create_user(&self, email: &str, role: UserRole) -> StorageResult<usize>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: usize) -> StorageResult<Option<User>>;

    /// Lookup by normalized email.
    /// Returns Ok(None) if no user is registered with that email.
    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Returns all users ordered by id.
    fn get_all_users(&self) -> StorageResult<Vec<User>>;

    /// Returns false if the user does not exist.
    fn set_user_role(&self, user_id: usize, role: UserRole) -> StorageResult<bool>;

    /// Returns false if the user does not exist.
    fn set_user_active(&self, user_id: usize, is_active: bool) -> StorageResult<bool>;

    /// Returns Ok(None) if the user has no password set.
    fn get_password_credentials(&self, user_id: usize) -> StorageResult<Option<PasswordCredentials>>;

    /// Inserts or replaces the password credentials of a user.
    fn upsert_password_credentials(&self, credentials: &PasswordCredentials) -> StorageResult<()>;

    /// Records a login attempt against the stored credentials.
    /// `last_used` is only touched when the attempt succeeded.
    fn record_password_attempt(
        &self,
        user_id: usize,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;
}
