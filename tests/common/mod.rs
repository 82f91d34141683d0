//! Common test infrastructure
//!
//! Builds the whole component graph on top of a temporary SQLite database,
//! a manual clock and a sleeper that only records the requested waits.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestEnv;
//!
//! #[test]
//! fn test_upload() {
//!     let env = TestEnv::new();
//!     let resume = env.workflow.upload(env.regular.id, &common::pdf_bytes(), "cv.pdf").unwrap();
//! }
//! ```

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use mentorhub_core::config::{ResumeSettings, RetrySettings, SessionSettings};
use mentorhub_core::user::User;
use mentorhub_core::{
    AuthGateway, FsObjectStorage, ManualClock, ResumeWorkflow, RetryPolicy, SessionManager,
    Sleeper, SqliteStore, UserManager, UserRole,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const ADMIN_EMAIL: &str = "admin@mentorhub.test";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const REGULAR_EMAIL: &str = "student@mentorhub.test";
pub const REGULAR_PASSWORD: &str = "student-password";

pub const DESKTOP_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
pub const IPHONE_UA: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";

/// A minimal document starting with the PDF signature.
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n".to_vec()
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub waits: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

pub struct TestEnv {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<ManualClock>,
    pub sleeper: Arc<RecordingSleeper>,
    pub users: UserManager,
    pub sessions: Arc<SessionManager>,
    pub gateway: AuthGateway,
    pub workflow: ResumeWorkflow,
    pub admin: User,
    pub regular: User,
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_resume_settings(ResumeSettings::default())
    }

    pub fn with_resume_settings(resume_settings: ResumeSettings) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("mentorhub.db")).unwrap());
        let clock = Arc::new(ManualClock::new(start_time()));
        let sleeper = Arc::new(RecordingSleeper::default());
        let retry = RetryPolicy::new(&RetrySettings::default()).with_sleeper(sleeper.clone());

        let users = UserManager::new(store.clone(), retry.clone(), clock.clone());
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            retry.clone(),
            clock.clone(),
            SessionSettings::default().ttl(),
        ));
        let gateway = AuthGateway::new(store.clone(), sessions.clone(), retry.clone(), clock.clone());
        let workflow = ResumeWorkflow::new(
            store.clone(),
            store.clone(),
            Arc::new(FsObjectStorage::new(temp_dir.path().join("objects"))),
            retry,
            clock.clone(),
            resume_settings,
        );

        let admin = users
            .add_user(ADMIN_EMAIL, ADMIN_PASSWORD, UserRole::Admin)
            .unwrap();
        let regular = users
            .add_user(REGULAR_EMAIL, REGULAR_PASSWORD, UserRole::Regular)
            .unwrap();

        Self {
            store,
            clock,
            sleeper,
            users,
            sessions,
            gateway,
            workflow,
            admin,
            regular,
            temp_dir,
        }
    }

    /// Creates one more regular user.
    pub fn add_regular_user(&self, email: &str) -> User {
        self.users
            .add_user(email, "some-password", UserRole::Regular)
            .unwrap()
    }

    pub fn object_exists(&self, key: &str) -> bool {
        self.temp_dir.path().join("objects").join(key).exists()
    }
}
