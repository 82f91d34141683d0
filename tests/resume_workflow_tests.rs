//! End-to-end tests for the resume review workflow

mod common;

use chrono::Duration;
use common::*;
use mentorhub_core::config::ResumeSettings;
use mentorhub_core::{CoreError, ResumeStatus};

#[test]
fn test_upload_review_then_upload_again() {
    let env = TestEnv::new();

    let first = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "my_cv.pdf")
        .unwrap();
    assert_eq!(first.status, ResumeStatus::Pending);
    assert_eq!(first.user_id, env.regular.id);
    assert_eq!(first.file_name, "my_cv.pdf");
    assert!(first
        .file_path
        .starts_with(&format!("resumes/{}/", env.regular.id)));
    assert!(first.file_path.ends_with(".pdf"));
    assert!(env.object_exists(&first.file_path));

    env.clock.advance(Duration::hours(3));
    let review = env
        .workflow
        .submit_review(first.id, env.admin.id, "Good format")
        .unwrap();
    assert_eq!(review.resume_id, first.id);
    assert_eq!(review.reviewer_id, env.admin.id);
    assert_eq!(review.comments, "Good format");

    let reviewed = env.workflow.get(first.id, env.regular.id).unwrap();
    assert_eq!(reviewed.status, ResumeStatus::Reviewed);
    assert_eq!(reviewed.updated_at, start_time() + Duration::hours(3));

    let reviews = env.workflow.reviews_for(first.id, env.regular.id).unwrap();
    assert_eq!(reviews, vec![review]);

    let second = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "my_cv_v2.pdf")
        .unwrap();
    assert_eq!(second.status, ResumeStatus::Pending);
    assert_ne!(second.file_path, first.file_path);
}

#[test]
fn test_upload_conflicts_while_a_resume_is_active() {
    let env = TestEnv::new();
    let first = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    let err = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv2.pdf")
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    assert_eq!(err.status_code(), 409);

    env.workflow.start_review(first.id, env.admin.id).unwrap();
    let err = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv2.pdf")
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    assert_eq!(
        env.workflow
            .list_for_user(env.regular.id, env.regular.id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_upload_validation() {
    let env = TestEnv::with_resume_settings(ResumeSettings {
        max_file_size_bytes: 256,
        ..ResumeSettings::default()
    });

    let cases: Vec<(Vec<u8>, &str)> = vec![
        (vec![], "cv.pdf"),
        (pdf_bytes(), "cv.docx"),
        (b"just some plain text".to_vec(), "cv.pdf"),
        ([b"%PDF-1.4".as_slice(), [b'x'; 300].as_slice()].concat(), "big.pdf"),
        (pdf_bytes(), ""),
    ];
    for (bytes, name) in cases {
        let err = env.workflow.upload(env.regular.id, &bytes, name).unwrap_err();
        assert!(
            matches!(err, CoreError::Validation(_)),
            "{} should be rejected, got {:?}",
            name,
            err
        );
    }

    let accepted = env
        .workflow
        .upload(env.regular.id, b"%PDF-1.7\n%%EOF\n", "CV.PDF")
        .unwrap();
    assert_eq!(accepted.file_name, "CV.PDF");
}

#[test]
fn test_submit_review_rules() {
    let env = TestEnv::new();
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    let err = env
        .workflow
        .submit_review(resume.id, env.regular.id, "Looks great")
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
    assert_eq!(err.status_code(), 403);

    let err = env
        .workflow
        .submit_review(9999, env.admin.id, "Looks great")
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = env
        .workflow
        .submit_review(resume.id, env.admin.id, "   ")
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    env.workflow
        .submit_review(resume.id, env.admin.id, "  Tighten the summary  ")
        .unwrap();
    let err = env
        .workflow
        .submit_review(resume.id, env.admin.id, "Second opinion")
        .unwrap_err();
    assert!(matches!(err, CoreError::State(_)));
    assert_eq!(err.status_code(), 422);

    let reviews = env.workflow.reviews_for(resume.id, env.admin.id).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].comments, "Tighten the summary");
}

#[test]
fn test_review_from_in_review() {
    let env = TestEnv::new();
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    let claimed = env.workflow.start_review(resume.id, env.admin.id).unwrap();
    assert_eq!(claimed.status, ResumeStatus::InReview);

    let err = env
        .workflow
        .start_review(resume.id, env.admin.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::State(_)));

    env.workflow
        .submit_review(resume.id, env.admin.id, "Fine")
        .unwrap();
    let resume = env.workflow.get(resume.id, env.admin.id).unwrap();
    assert_eq!(resume.status, ResumeStatus::Reviewed);
}

#[test]
fn test_delete_in_review_is_always_refused() {
    let env = TestEnv::new();
    let stranger = env.add_regular_user("stranger@mentorhub.test");
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();
    env.workflow.start_review(resume.id, env.admin.id).unwrap();

    for requester in [env.regular.id, env.admin.id, stranger.id] {
        let err = env.workflow.delete(resume.id, requester).unwrap_err();
        assert!(matches!(err, CoreError::State(_)));
    }
    assert!(env.object_exists(&resume.file_path));
}

#[test]
fn test_delete_by_owner_and_admin() {
    let env = TestEnv::new();
    let stranger = env.add_regular_user("stranger@mentorhub.test");
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    let err = env.workflow.delete(resume.id, stranger.id).unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));

    env.workflow.delete(resume.id, env.regular.id).unwrap();
    assert!(!env.object_exists(&resume.file_path));
    let err = env.workflow.get(resume.id, env.regular.id).unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    // A reviewed resume, with its review, can be removed by an admin
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();
    env.workflow
        .submit_review(resume.id, env.admin.id, "Ok")
        .unwrap();
    env.workflow.delete(resume.id, env.admin.id).unwrap();
    assert!(env
        .workflow
        .list_for_user(env.regular.id, env.regular.id)
        .unwrap()
        .is_empty());
}

#[test]
fn test_get_requires_owner_or_admin() {
    let env = TestEnv::new();
    let stranger = env.add_regular_user("stranger@mentorhub.test");
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    assert_eq!(env.workflow.get(resume.id, env.regular.id).unwrap(), resume);
    assert_eq!(env.workflow.get(resume.id, env.admin.id).unwrap(), resume);
    let err = env.workflow.get(resume.id, stranger.id).unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));

    let err = env
        .workflow
        .list_for_user(env.regular.id, stranger.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
    let err = env
        .workflow
        .reviews_for(resume.id, stranger.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
}

#[test]
fn test_update_status_is_admin_only_and_unchecked() {
    let env = TestEnv::new();
    let resume = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();

    let err = env
        .workflow
        .update_status(resume.id, ResumeStatus::Reviewed, env.regular.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));

    let forced = env
        .workflow
        .update_status(resume.id, ResumeStatus::Reviewed, env.admin.id)
        .unwrap();
    assert_eq!(forced.status, ResumeStatus::Reviewed);
    // No review is created by a forced transition
    assert!(env
        .workflow
        .reviews_for(resume.id, env.admin.id)
        .unwrap()
        .is_empty());

    let back = env
        .workflow
        .update_status(resume.id, ResumeStatus::InReview, env.admin.id)
        .unwrap();
    assert_eq!(back.status, ResumeStatus::InReview);
}

#[test]
fn test_update_status_cannot_create_second_active_resume() {
    let env = TestEnv::new();
    let first = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap();
    env.workflow
        .submit_review(first.id, env.admin.id, "Ok")
        .unwrap();
    env.workflow
        .upload(env.regular.id, &pdf_bytes(), "cv2.pdf")
        .unwrap();

    let err = env
        .workflow
        .update_status(first.id, ResumeStatus::Pending, env.admin.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
    let first = env.workflow.get(first.id, env.admin.id).unwrap();
    assert_eq!(first.status, ResumeStatus::Reviewed);
}

#[test]
fn test_list_for_review_pages_oldest_first() {
    let env = TestEnv::new();
    let mut expected = vec![];
    for i in 0..5 {
        let user = env.add_regular_user(&format!("user{}@mentorhub.test", i));
        let resume = env
            .workflow
            .upload(user.id, &pdf_bytes(), "cv.pdf")
            .unwrap();
        expected.push(resume.id);
        env.clock.advance(Duration::minutes(1));
    }
    // Reviewed resumes leave the queue
    env.workflow
        .submit_review(expected.remove(0), env.admin.id, "Done")
        .unwrap();

    let page1 = env.workflow.list_for_review(env.admin.id, 1, 3).unwrap();
    assert_eq!(page1.total, 4);
    assert_eq!(page1.limit, 3);
    assert!(page1.has_next());
    let page2 = env.workflow.list_for_review(env.admin.id, 2, 3).unwrap();
    assert!(!page2.has_next());

    let listed: Vec<usize> = page1
        .items
        .iter()
        .chain(page2.items.iter())
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, expected);

    let beyond = env.workflow.list_for_review(env.admin.id, 3, 3).unwrap();
    assert!(beyond.items.is_empty());
}

#[test]
fn test_list_for_review_arguments() {
    let env = TestEnv::new();

    let err = env
        .workflow
        .list_for_review(env.regular.id, 1, 10)
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));

    let err = env.workflow.list_for_review(env.admin.id, 0, 10).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    let err = env.workflow.list_for_review(env.admin.id, 1, 0).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let page = env.workflow.list_for_review(env.admin.id, 1, 10_000).unwrap();
    assert_eq!(page.limit, ResumeSettings::default().max_page_limit);
    assert_eq!(page.total, 0);
}

#[test]
fn test_inactive_user_cannot_upload() {
    let env = TestEnv::new();
    env.users.set_active(REGULAR_EMAIL, false).unwrap();

    let err = env
        .workflow
        .upload(env.regular.id, &pdf_bytes(), "cv.pdf")
        .unwrap_err();
    assert!(matches!(err, CoreError::Authorization(_)));
}
