//! In-memory reference backend. Carries the same atomicity guarantees as the
//! MongoDB backend (one mutex stands in for the unique index and CAS) and is
//! what the integration tests run against.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::answer::AnswerSubmission;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::{AttemptStatus, ExamAttempt};
use crate::store::{AttemptStore, CreateOutcome, ExamStore, FinishOutcome};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    exams: HashMap<String, Exam>,
    questions: HashMap<String, Vec<Question>>,
    attempts: HashMap<String, ExamAttempt>,
    /// (exam_id, student_id) pairs with an in-progress attempt; stands in
    /// for the partial unique index of the MongoDB backend.
    active: HashSet<(String, String)>,
    /// attempt_id -> question_id -> submission.
    submissions: HashMap<String, HashMap<String, AnswerSubmission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an exam and its question set, keeping questions in sequence
    /// order.
    pub fn insert_exam(&self, exam: Exam, mut questions: Vec<Question>) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        questions.sort_by_key(|q| q.sequence);
        inner.questions.insert(exam.id.clone(), questions);
        inner.exams.insert(exam.id.clone(), exam);
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn get_exam(&self, exam_id: &str) -> Result<Option<Exam>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.exams.get(exam_id).cloned())
    }

    async fn list_questions(&self, exam_id: &str) -> Result<Vec<Question>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.questions.get(exam_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn create_attempt(&self, attempt: &ExamAttempt) -> Result<CreateOutcome> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let key = (attempt.exam_id.clone(), attempt.student_id.clone());
        if attempt.status == AttemptStatus::InProgress && inner.active.contains(&key) {
            return Ok(CreateOutcome::ActiveAttemptExists);
        }
        if attempt.status == AttemptStatus::InProgress {
            inner.active.insert(key);
        }
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(CreateOutcome::Created)
    }

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner.attempts.get(attempt_id).cloned())
    }

    async fn list_attempts(&self, exam_id: &str, student_id: &str) -> Result<Vec<ExamAttempt>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut attempts: Vec<ExamAttempt> = inner
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id && a.student_id == student_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(attempts)
    }

    async fn count_attempts(&self, exam_id: &str, student_id: &str) -> Result<u64> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id && a.student_id == student_id)
            .count() as u64)
    }

    async fn upsert_submission(&self, submission: &AnswerSubmission) -> Result<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner
            .submissions
            .entry(submission.attempt_id.clone())
            .or_default()
            .insert(submission.question_id.clone(), submission.clone());
        Ok(())
    }

    async fn list_submissions(&self, attempt_id: &str) -> Result<Vec<AnswerSubmission>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut rows: Vec<AnswerSubmission> = inner
            .submissions
            .get(attempt_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(rows)
    }

    async fn finish_attempt(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        finished_at: DateTime<Utc>,
        score: i32,
    ) -> Result<FinishOutcome> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let attempt = inner
            .attempts
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| anyhow!("attempt {} not found in store", attempt_id))?;

        if attempt.status.is_terminal() {
            return Ok(FinishOutcome::AlreadyTerminal(attempt));
        }

        let key = (attempt.exam_id.clone(), attempt.student_id.clone());
        inner.active.remove(&key);

        let stored = inner
            .attempts
            .get_mut(attempt_id)
            .expect("attempt vanished under lock");
        stored.status = status;
        stored.finished_at = Some(finished_at);
        stored.score = Some(score);
        Ok(FinishOutcome::Transitioned(stored.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn attempt(id: &str, student: &str) -> ExamAttempt {
        let now = Utc::now();
        let mut a = ExamAttempt::new("exam-1", student, now, now + Duration::hours(1));
        a.id = id.to_string();
        a
    }

    #[tokio::test]
    async fn second_active_attempt_is_a_conflict() {
        let store = MemoryStore::new();
        let first = store.create_attempt(&attempt("a-1", "s-1")).await.unwrap();
        assert!(matches!(first, CreateOutcome::Created));

        let second = store.create_attempt(&attempt("a-2", "s-1")).await.unwrap();
        assert!(matches!(second, CreateOutcome::ActiveAttemptExists));

        // A different student is unaffected.
        let other = store.create_attempt(&attempt("a-3", "s-2")).await.unwrap();
        assert!(matches!(other, CreateOutcome::Created));
    }

    #[tokio::test]
    async fn finishing_releases_the_active_slot() {
        let store = MemoryStore::new();
        store.create_attempt(&attempt("a-1", "s-1")).await.unwrap();
        store
            .finish_attempt("a-1", AttemptStatus::Finished, Utc::now(), 40)
            .await
            .unwrap();

        let next = store.create_attempt(&attempt("a-2", "s-1")).await.unwrap();
        assert!(matches!(next, CreateOutcome::Created));
    }

    #[tokio::test]
    async fn finish_is_compare_and_set() {
        let store = MemoryStore::new();
        store.create_attempt(&attempt("a-1", "s-1")).await.unwrap();

        let first = store
            .finish_attempt("a-1", AttemptStatus::Finished, Utc::now(), 40)
            .await
            .unwrap();
        let FinishOutcome::Transitioned(row) = first else {
            panic!("first finish must transition");
        };
        assert_eq!(row.score, Some(40));

        let second = store
            .finish_attempt("a-1", AttemptStatus::Finished, Utc::now(), 99)
            .await
            .unwrap();
        let FinishOutcome::AlreadyTerminal(row) = second else {
            panic!("second finish must observe the stored row");
        };
        assert_eq!(row.score, Some(40));
    }

    #[tokio::test]
    async fn submission_upsert_keeps_one_row_per_question() {
        let store = MemoryStore::new();
        let earlier = AnswerSubmission::new(
            "a-1",
            "q-1",
            vec!["first".to_string()],
            crate::models::answer::Verdict::Incorrect,
            Some(0),
            Utc::now(),
        );
        let later = AnswerSubmission::new(
            "a-1",
            "q-1",
            vec!["second".to_string()],
            crate::models::answer::Verdict::Correct,
            Some(20),
            Utc::now(),
        );
        store.upsert_submission(&earlier).await.unwrap();
        store.upsert_submission(&later).await.unwrap();

        let rows = store.list_submissions("a-1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answer, vec!["second".to_string()]);
    }
}
