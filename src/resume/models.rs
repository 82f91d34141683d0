//! Resume records, reviews and the status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an uploaded resume.
///
/// `Pending` can go to `InReview` or straight to `Reviewed`,
/// `InReview` can only go to `Reviewed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResumeStatus {
    Pending,
    InReview,
    Reviewed, // terminal
}

impl ResumeStatus {
    /// A user holds at most one active resume.
    pub fn is_active(&self) -> bool {
        matches!(self, ResumeStatus::Pending | ResumeStatus::InReview)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResumeStatus::Pending => "PENDING",
            ResumeStatus::InReview => "IN_REVIEW",
            ResumeStatus::Reviewed => "REVIEWED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ResumeStatus::Pending),
            "IN_REVIEW" => Some(ResumeStatus::InReview),
            "REVIEWED" => Some(ResumeStatus::Reviewed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resume {
    pub id: usize,
    pub user_id: usize,
    /// Name the file was uploaded with.
    pub file_name: String,
    /// Object storage key.
    pub file_path: String,
    pub status: ResumeStatus,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResume {
    pub user_id: usize,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeReview {
    pub id: usize,
    pub resume_id: usize,
    pub reviewer_id: usize,
    pub comments: String,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewResumeReview {
    pub resume_id: usize,
    pub reviewer_id: usize,
    pub comments: String,
}

/// One page of a listing. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.limit) < self.total
    }
}

/// Result of a guarded delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(Resume),
    /// The resume exists but is in the blocked status, nothing was removed.
    Blocked(Resume),
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            ResumeStatus::Pending,
            ResumeStatus::InReview,
            ResumeStatus::Reviewed,
        ] {
            assert_eq!(ResumeStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ResumeStatus::from_str("pending"), None);
        assert_eq!(ResumeStatus::from_str("DONE"), None);
    }

    #[test]
    fn active_statuses() {
        assert!(ResumeStatus::Pending.is_active());
        assert!(ResumeStatus::InReview.is_active());
        assert!(!ResumeStatus::Reviewed.is_active());
    }

    #[test]
    fn status_serializes_like_storage() {
        assert_eq!(
            serde_json::to_string(&ResumeStatus::InReview).unwrap(),
            "\"IN_REVIEW\""
        );
    }

    #[test]
    fn page_has_next() {
        let page = Page::<u8> {
            items: vec![],
            page: 1,
            limit: 10,
            total: 11,
        };
        assert!(page.has_next());
        assert!(!Page { page: 2, ..page }.has_next());
    }
}
