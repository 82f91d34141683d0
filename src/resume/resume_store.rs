use super::models::{DeleteOutcome, NewResume, NewResumeReview, Resume, ResumeReview, ResumeStatus};
use crate::error::StorageResult;
use chrono::{DateTime, Utc};

pub trait ResumeStore: Send + Sync {
    /// Persists a PENDING resume.
    /// Fails with an integrity error if the user already has an active one.
    fn insert_resume(&self, resume: &NewResume) -> StorageResult<Resume>;

    fn get_resume(&self, resume_id: usize) -> StorageResult<Option<Resume>>;

    /// The PENDING or IN_REVIEW resume of a user, if any.
    fn get_active_resume_for_user(&self, user_id: usize) -> StorageResult<Option<Resume>>;

    /// Newest upload first.
    fn list_resumes_for_user(&self, user_id: usize) -> StorageResult<Vec<Resume>>;

    /// Oldest upload first, id as tie-break.
    fn list_resumes_by_status(
        &self,
        status: ResumeStatus,
        offset: usize,
        limit: usize,
    ) -> StorageResult<Vec<Resume>>;

    fn count_resumes_by_status(&self, status: ResumeStatus) -> StorageResult<usize>;

    /// Unconditional status update. Returns Ok(None) if the resume does not exist.
    fn set_resume_status(
        &self,
        resume_id: usize,
        status: ResumeStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Resume>>;

    /// Moves the resume to `to` only if it currently is in `from`.
    /// Returns Ok(None) when nothing matched.
    fn transition_resume_status(
        &self,
        resume_id: usize,
        from: ResumeStatus,
        to: ResumeStatus,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<Resume>>;

    /// In a single transaction: moves an active resume to REVIEWED and
    /// records the review. Returns Ok(None) and writes nothing if the resume
    /// was not active anymore.
    fn complete_review(
        &self,
        review: &NewResumeReview,
        now: DateTime<Utc>,
    ) -> StorageResult<Option<ResumeReview>>;

    /// Deletes the resume (and its reviews) unless its status is `blocked_status`.
    fn delete_resume_unless(
        &self,
        resume_id: usize,
        blocked_status: ResumeStatus,
    ) -> StorageResult<DeleteOutcome>;

    /// Oldest review first.
    fn get_reviews_for_resume(&self, resume_id: usize) -> StorageResult<Vec<ResumeReview>>;
}
