mod common;

use chrono::{Duration, Utc};
use exam_attempts::models::AttemptStatus;
use exam_attempts::store::memory::MemoryStore;
use exam_attempts::{AttemptError, AttemptService, ErrorKind};
use std::sync::Arc;

#[tokio::test]
async fn test_start_attempt_creates_in_progress_record() {
    let (_store, service) = common::create_test_service();

    let attempt = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();

    assert_eq!(attempt.exam_id, common::EXAM_ID);
    assert_eq!(attempt.student_id, "student-1");
    assert_eq!(attempt.status, AttemptStatus::InProgress);
    assert!(attempt.finished_at.is_none());
    assert!(attempt.score.is_none());
    // One-hour duration inside a window that stays open longer.
    let expected_end = attempt.started_at + Duration::seconds(3600);
    assert_eq!(attempt.ends_at, expected_end);
}

#[tokio::test]
async fn test_start_attempt_unknown_exam_is_not_found() {
    let (_store, service) = common::create_test_service();

    let err = service
        .start_attempt("exam-missing", "student-1")
        .await
        .unwrap_err();

    assert!(matches!(err, AttemptError::ExamNotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_start_attempt_outside_window_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut exam = common::open_exam("exam-closed");
    exam.closes_at = Utc::now() - Duration::minutes(5);
    store.insert_exam(exam, vec![]);
    let service = AttemptService::new(store.clone(), store);

    let err = service
        .start_attempt("exam-closed", "student-1")
        .await
        .unwrap_err();

    assert!(matches!(err, AttemptError::ExamNotEligible(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_unpublished_exam_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut exam = common::open_exam("exam-draft");
    exam.published = false;
    store.insert_exam(exam, vec![]);
    let service = AttemptService::new(store.clone(), store);

    let err = service
        .start_attempt("exam-draft", "student-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::ExamNotEligible(_)));
}

#[tokio::test]
async fn test_second_start_while_active_is_a_conflict() {
    let (_store, service) = common::create_test_service();

    service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();

    let err = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap_err();
    assert!(matches!(err, AttemptError::AttemptAlreadyActive { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // A different student still gets in.
    service
        .start_attempt(common::EXAM_ID, "student-2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicate_starts_resolve_to_one_attempt() {
    let (_store, service) = common::create_test_service();

    let (first, second) = tokio::join!(
        service.start_attempt(common::EXAM_ID, "student-1"),
        service.start_attempt(common::EXAM_ID, "student-1"),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let conflict = [first, second]
        .into_iter()
        .find_map(|r| r.err())
        .expect("one call must lose");
    assert!(matches!(conflict, AttemptError::AttemptAlreadyActive { .. }));

    let history = service
        .list_attempts(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, AttemptStatus::InProgress);
}

#[tokio::test]
async fn test_finishing_frees_the_active_slot_for_a_retake() {
    let (_store, service) = common::create_test_service();

    let attempt = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    service
        .finish_attempt(&attempt.id, "student-1")
        .await
        .unwrap();

    let retake = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    assert_ne!(retake.id, attempt.id);
}

#[tokio::test]
async fn test_attempt_limit_is_enforced_when_configured() {
    let store = Arc::new(MemoryStore::new());
    store.insert_exam(common::open_exam(common::EXAM_ID), common::question_set());
    let service = AttemptService::new(store.clone(), store).with_attempt_limit(1);

    let attempt = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    service
        .finish_attempt(&attempt.id, "student-1")
        .await
        .unwrap();

    let err = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AttemptError::AttemptLimitReached { limit: 1, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_history_is_newest_first_and_soft_retained() {
    let (_store, service) = common::create_test_service();

    let first = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    service
        .finish_attempt(&first.id, "student-1")
        .await
        .unwrap();
    let second = service
        .start_attempt(common::EXAM_ID, "student-1")
        .await
        .unwrap();

    let history = service
        .list_attempts(common::EXAM_ID, "student-1")
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[1].id, first.id);
    assert_eq!(history[1].status, AttemptStatus::Finished);
}
