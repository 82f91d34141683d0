pub mod auth;
pub mod permissions;
mod sqlite_user_store;
mod user_manager;
pub mod user_models;
mod user_store;

pub use auth::{CredentialHasher, PasswordCredentials};
pub use permissions::{can, Action, Permission, Resource, Subject, UserRole};
pub use user_manager::{UserManager, MIN_PASSWORD_LEN};
pub use user_models::{normalize_email, User};
pub use user_store::UserStore;
