//! Resume review workflow.
//!
//! Owns the status state machine and the authorization decisions for resume
//! operations. Bytes go to [`ObjectStorage`], records to [`ResumeStore`], and
//! every storage call is wrapped in the [`RetryPolicy`].
//!
//! ```text
//! PENDING ──start_review──▶ IN_REVIEW
//!    │                          │
//!    └──────submit_review───────┴──▶ REVIEWED
//! ```

use super::models::{
    DeleteOutcome, NewResume, NewResumeReview, Page, Resume, ResumeReview, ResumeStatus,
};
use super::object_storage::ObjectStorage;
use super::resume_store::ResumeStore;
use crate::clock::Clock;
use crate::config::ResumeSettings;
use crate::error::{CoreError, CoreResult, StorageError};
use crate::retry_policy::RetryPolicy;
use crate::user::{can, Action, Resource, Subject, UserStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const PDF_EXTENSION: &str = "pdf";
const PDF_MIME_TYPE: &str = "application/pdf";

pub struct ResumeWorkflow {
    resumes: Arc<dyn ResumeStore>,
    users: Arc<dyn UserStore>,
    objects: Arc<dyn ObjectStorage>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    settings: ResumeSettings,
}

impl ResumeWorkflow {
    pub fn new(
        resumes: Arc<dyn ResumeStore>,
        users: Arc<dyn UserStore>,
        objects: Arc<dyn ObjectStorage>,
        retry: RetryPolicy,
        clock: Arc<dyn Clock>,
        settings: ResumeSettings,
    ) -> Self {
        Self {
            resumes,
            users,
            objects,
            retry,
            clock,
            settings,
        }
    }

    /// Unknown and deactivated accounts can't act on anything.
    fn subject(&self, user_id: usize) -> CoreResult<Subject> {
        match self
            .retry
            .execute("get_user", || self.users.get_user(user_id))?
        {
            Some(user) if user.is_active => Ok(user.as_subject()),
            _ => Err(CoreError::Authorization(format!(
                "User {} is unknown or inactive",
                user_id
            ))),
        }
    }

    fn require(subject: &Subject, resource: Resource<'_>, action: Action) -> CoreResult<()> {
        if can(subject, &resource, action) {
            Ok(())
        } else {
            Err(CoreError::Authorization(format!(
                "User {} is not allowed to {:?} this resource",
                subject.user_id, action
            )))
        }
    }

    fn load(&self, resume_id: usize) -> CoreResult<Resume> {
        self.retry
            .execute("get_resume", || self.resumes.get_resume(resume_id))?
            .ok_or_else(|| CoreError::NotFound(format!("Resume {} not found", resume_id)))
    }

    fn validate_upload(&self, file_bytes: &[u8], file_name: &str) -> CoreResult<String> {
        if file_bytes.is_empty() {
            return Err(CoreError::Validation("The uploaded file is empty".to_string()));
        }

        let size = file_bytes.len() as u64;
        if size > self.settings.max_file_size_bytes {
            return Err(CoreError::Validation(format!(
                "The uploaded file is too large ({:#}, max {:#})",
                byte_unit::Byte::from(size),
                byte_unit::Byte::from(self.settings.max_file_size_bytes)
            )));
        }

        let file_name = sanitize_file_name(file_name)?;
        let has_pdf_extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(PDF_EXTENSION));
        let has_pdf_signature =
            infer::get(file_bytes).is_some_and(|kind| kind.mime_type() == PDF_MIME_TYPE);
        if !has_pdf_extension || !has_pdf_signature {
            return Err(CoreError::Validation(format!(
                "{} is not a PDF document",
                file_name
            )));
        }

        Ok(file_name)
    }

    /// Stores a new resume for `user_id` and returns its PENDING record.
    pub fn upload(&self, user_id: usize, file_bytes: &[u8], file_name: &str) -> CoreResult<Resume> {
        let subject = self.subject(user_id)?;
        Self::require(&subject, Resource::ResumesOf(user_id), Action::Upload)?;
        let file_name = self.validate_upload(file_bytes, file_name)?;

        let active = self.retry.execute("get_active_resume_for_user", || {
            self.resumes.get_active_resume_for_user(user_id)
        })?;
        if let Some(active) = active {
            return Err(CoreError::Conflict(format!(
                "User {} already has resume {} in status {}",
                user_id,
                active.id,
                active.status.as_str()
            )));
        }

        let key = format!("resumes/{}/{}.{}", user_id, Uuid::new_v4(), PDF_EXTENSION);
        let file_path = self
            .retry
            .execute("put_object", || self.objects.put(file_bytes, &key))?;

        let new_resume = NewResume {
            user_id,
            file_name,
            file_path,
            uploaded_at: self.clock.now(),
        };
        let inserted = self
            .retry
            .execute("insert_resume", || self.resumes.insert_resume(&new_resume));

        match inserted {
            Ok(resume) => {
                info!(
                    "User {} uploaded resume {} ({} bytes)",
                    user_id,
                    resume.id,
                    file_bytes.len()
                );
                Ok(resume)
            }
            Err(err) => {
                self.discard_object(&new_resume.file_path);
                Err(match err {
                    StorageError::Integrity(_) => CoreError::Conflict(format!(
                        "User {} already has an active resume",
                        user_id
                    )),
                    other => other.into(),
                })
            }
        }
    }

    /// Best effort, a leftover object is only logged.
    fn discard_object(&self, key: &str) {
        if let Err(err) = self
            .retry
            .execute("delete_object", || self.objects.delete(key))
        {
            warn!("Could not remove stored object {}: {}", key, err);
        }
    }

    /// Claims a PENDING resume for review.
    pub fn start_review(&self, resume_id: usize, reviewer_id: usize) -> CoreResult<Resume> {
        let subject = self.subject(reviewer_id)?;
        Self::require(&subject, Resource::ReviewQueue, Action::Review)?;

        let resume = self.load(resume_id)?;
        if resume.status != ResumeStatus::Pending {
            return Err(CoreError::State(format!(
                "Resume {} is {}, only PENDING resumes can be claimed",
                resume_id,
                resume.status.as_str()
            )));
        }

        let now = self.clock.now();
        let moved = self.retry.execute("transition_resume_status", || {
            self.resumes.transition_resume_status(
                resume_id,
                ResumeStatus::Pending,
                ResumeStatus::InReview,
                now,
            )
        })?;
        let resume = moved.ok_or_else(|| {
            CoreError::State(format!("Resume {} was claimed concurrently", resume_id))
        })?;
        info!("Reviewer {} started reviewing resume {}", reviewer_id, resume_id);
        Ok(resume)
    }

    /// Records a review and marks the resume REVIEWED, atomically.
    pub fn submit_review(
        &self,
        resume_id: usize,
        reviewer_id: usize,
        comments: &str,
    ) -> CoreResult<ResumeReview> {
        let subject = self.subject(reviewer_id)?;
        Self::require(&subject, Resource::ReviewQueue, Action::Review)?;

        let resume = self.load(resume_id)?;
        if !resume.status.is_active() {
            return Err(CoreError::State(format!(
                "Resume {} is already {}",
                resume_id,
                resume.status.as_str()
            )));
        }

        let comments = comments.trim();
        if comments.is_empty() {
            return Err(CoreError::Validation(
                "Review comments cannot be empty".to_string(),
            ));
        }

        let new_review = NewResumeReview {
            resume_id,
            reviewer_id,
            comments: comments.to_string(),
        };
        let now = self.clock.now();
        let review = self
            .retry
            .execute("complete_review", || self.resumes.complete_review(&new_review, now))?
            .ok_or_else(|| {
                CoreError::State(format!("Resume {} was reviewed concurrently", resume_id))
            })?;

        info!(
            "Reviewer {} reviewed resume {} (review {})",
            reviewer_id, resume_id, review.id
        );
        Ok(review)
    }

    /// Forces a status, regardless of the usual transitions.
    pub fn update_status(
        &self,
        resume_id: usize,
        new_status: ResumeStatus,
        requesting_user_id: usize,
    ) -> CoreResult<Resume> {
        let subject = self.subject(requesting_user_id)?;
        let resume = self.load(resume_id)?;
        Self::require(&subject, Resource::Resume(&resume), Action::OverrideStatus)?;

        let now = self.clock.now();
        let updated = self
            .retry
            .execute("set_resume_status", || {
                self.resumes.set_resume_status(resume_id, new_status, now)
            })
            .map_err(|err| match err {
                StorageError::Integrity(_) => CoreError::Conflict(format!(
                    "User {} already has another active resume",
                    resume.user_id
                )),
                other => other.into(),
            })?
            .ok_or_else(|| CoreError::NotFound(format!("Resume {} not found", resume_id)))?;

        info!(
            "User {} forced resume {} from {} to {}",
            requesting_user_id,
            resume_id,
            resume.status.as_str(),
            new_status.as_str()
        );
        Ok(updated)
    }

    pub fn get(&self, resume_id: usize, requesting_user_id: usize) -> CoreResult<Resume> {
        let subject = self.subject(requesting_user_id)?;
        let resume = self.load(resume_id)?;
        Self::require(&subject, Resource::Resume(&resume), Action::Read)?;
        Ok(resume)
    }

    /// Removes the record, its reviews and the stored file.
    /// A resume being reviewed can't be deleted by anybody.
    pub fn delete(&self, resume_id: usize, requesting_user_id: usize) -> CoreResult<()> {
        let subject = self.subject(requesting_user_id)?;
        let resume = self.load(resume_id)?;
        if resume.status == ResumeStatus::InReview {
            return Err(CoreError::State(format!(
                "Resume {} is being reviewed",
                resume_id
            )));
        }
        Self::require(&subject, Resource::Resume(&resume), Action::Delete)?;

        let outcome = self.retry.execute("delete_resume_unless", || {
            self.resumes
                .delete_resume_unless(resume_id, ResumeStatus::InReview)
        })?;
        match outcome {
            DeleteOutcome::Deleted(deleted) => {
                self.discard_object(&deleted.file_path);
                info!("User {} deleted resume {}", requesting_user_id, resume_id);
                Ok(())
            }
            DeleteOutcome::Blocked(_) => Err(CoreError::State(format!(
                "Resume {} is being reviewed",
                resume_id
            ))),
            DeleteOutcome::Missing => Err(CoreError::NotFound(format!(
                "Resume {} not found",
                resume_id
            ))),
        }
    }

    /// PENDING resumes, oldest upload first. `page` starts at 1.
    pub fn list_for_review(
        &self,
        reviewer_id: usize,
        page: usize,
        limit: usize,
    ) -> CoreResult<Page<Resume>> {
        let subject = self.subject(reviewer_id)?;
        Self::require(&subject, Resource::ReviewQueue, Action::Read)?;

        if page == 0 {
            return Err(CoreError::Validation("Page numbers start at 1".to_string()));
        }
        if limit == 0 {
            return Err(CoreError::Validation("Limit must be positive".to_string()));
        }
        let limit = limit.min(self.settings.max_page_limit);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| CoreError::Validation(format!("Page {} is out of range", page)))?;

        let items = self.retry.execute("list_resumes_by_status", || {
            self.resumes
                .list_resumes_by_status(ResumeStatus::Pending, offset, limit)
        })?;
        let total = self.retry.execute("count_resumes_by_status", || {
            self.resumes.count_resumes_by_status(ResumeStatus::Pending)
        })?;

        Ok(Page {
            items,
            page,
            limit,
            total,
        })
    }

    /// All resumes of `owner_id`, newest first.
    pub fn list_for_user(
        &self,
        owner_id: usize,
        requesting_user_id: usize,
    ) -> CoreResult<Vec<Resume>> {
        let subject = self.subject(requesting_user_id)?;
        Self::require(&subject, Resource::ResumesOf(owner_id), Action::Read)?;
        Ok(self.retry.execute("list_resumes_for_user", || {
            self.resumes.list_resumes_for_user(owner_id)
        })?)
    }

    pub fn reviews_for(
        &self,
        resume_id: usize,
        requesting_user_id: usize,
    ) -> CoreResult<Vec<ResumeReview>> {
        let subject = self.subject(requesting_user_id)?;
        let resume = self.load(resume_id)?;
        Self::require(&subject, Resource::Resume(&resume), Action::Read)?;
        Ok(self.retry.execute("get_reviews_for_resume", || {
            self.resumes.get_reviews_for_resume(resume_id)
        })?)
    }
}

/// Keeps only the final path component of an uploaded file name.
fn sanitize_file_name(file_name: &str) -> CoreResult<String> {
    let invalid = || CoreError::Validation(format!("Invalid file name {:?}", file_name));

    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name.starts_with('.') {
        return Err(invalid());
    }

    let sanitized: String = name.chars().filter(|c| !c.is_control()).collect();
    if sanitized.is_empty() {
        return Err(invalid());
    }
    Ok(sanitized)
}
