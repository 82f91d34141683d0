//! Roles, permissions and the capability check consulted by the workflows.

use crate::resume::Resume;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Upload, read and delete one's own resumes.
    OwnResumes,
    /// Claim and review resumes from the queue.
    ReviewResumes,
    /// Read, delete and force the status of anyone's resume.
    ManageResumes,
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::OwnResumes,
    Permission::ReviewResumes,
    Permission::ManageResumes,
];
const REGULAR_PERMISSIONS: &[Permission] = &[Permission::OwnResumes];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    Admin,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Regular => "Regular",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "regular" => Some(UserRole::Regular),
            _ => None,
        }
    }
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub user_id: usize,
    pub role: UserRole,
}

/// What is being asked about.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Resume(&'a Resume),
    /// The resume collection owned by the given user.
    ResumesOf(usize),
    ReviewQueue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Upload,
    Read,
    Delete,
    Review,
    OverrideStatus,
}

/// Single authorization decision point for resume operations.
pub fn can(subject: &Subject, resource: &Resource<'_>, action: Action) -> bool {
    let role = subject.role;
    let owns = |owner_id: usize| owner_id == subject.user_id && role.has_permission(Permission::OwnResumes);

    match (resource, action) {
        (Resource::ResumesOf(owner_id), Action::Upload) => owns(*owner_id),
        (Resource::ResumesOf(owner_id), Action::Read) => {
            owns(*owner_id) || role.has_permission(Permission::ManageResumes)
        }
        (Resource::Resume(resume), Action::Read | Action::Delete) => {
            owns(resume.user_id) || role.has_permission(Permission::ManageResumes)
        }
        (Resource::Resume(_) | Resource::ReviewQueue, Action::Review)
        | (Resource::ReviewQueue, Action::Read) => role.has_permission(Permission::ReviewResumes),
        (Resource::Resume(_), Action::OverrideStatus) => {
            role.has_permission(Permission::ManageResumes)
        }
        _ => false,
    }
}
