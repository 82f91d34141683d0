mod models;
mod object_storage;
mod resume_store;
mod sqlite_resume_store;
mod workflow;

pub use models::{DeleteOutcome, NewResume, NewResumeReview, Page, Resume, ResumeReview, ResumeStatus};
pub use object_storage::{FsObjectStorage, ObjectStorage};
pub use resume_store::ResumeStore;
pub use workflow::ResumeWorkflow;
