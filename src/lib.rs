//! MentorHub core library
//!
//! Session lifecycle, the resume review workflow and the retry wrapper that
//! guards every storage call. Controllers and binaries build on the types
//! re-exported here.

pub mod auth_gateway;
pub mod clock;
pub mod config;
pub mod error;
pub mod resume;
pub mod retry_policy;
pub mod session;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use auth_gateway::AuthGateway;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use error::{CoreError, CoreResult, StorageError, StorageResult};
pub use resume::{FsObjectStorage, ObjectStorage, ResumeStatus, ResumeStore, ResumeWorkflow};
pub use retry_policy::{RetryPolicy, Sleeper, ThreadSleeper};
pub use session::{SessionManager, SessionStore, SessionToken};
pub use sqlite_persistence::SqliteStore;
pub use user::{UserManager, UserRole, UserStore};
