use super::permissions::{Subject, UserRole};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: usize,
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created: DateTime<Utc>,
}

impl User {
    pub fn as_subject(&self) -> Subject {
        Subject {
            user_id: self.id,
            role: self.role,
        }
    }
}

/// Trims and lowercases an email address so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
