use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::answer::AnswerSubmission;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::{AttemptStatus, ExamAttempt};

pub mod memory;
pub mod mongo;

/// Outcome of the atomic insert-if-absent attempt creation. A uniqueness
/// conflict is a normal outcome here, not an error: it is how concurrent
/// duplicate starts are rejected without a read-then-write race.
#[derive(Debug)]
pub enum CreateOutcome {
    Created,
    ActiveAttemptExists,
}

/// Outcome of the compare-and-set finish transition. Exactly one caller ever
/// observes `Transitioned`; everyone else is handed the already-stored row.
#[derive(Debug)]
pub enum FinishOutcome {
    Transitioned(ExamAttempt),
    AlreadyTerminal(ExamAttempt),
}

/// Read-only access to exam metadata and question sets.
#[async_trait]
pub trait ExamStore: Send + Sync {
    async fn get_exam(&self, exam_id: &str) -> Result<Option<Exam>>;

    /// Question set in stable `sequence` order.
    async fn list_questions(&self, exam_id: &str) -> Result<Vec<Question>>;
}

/// Attempt and submission records, with the atomicity guarantees the
/// workflow relies on. Transient-failure retries belong to implementations
/// of this trait; the workflow itself never retries.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Atomic insert-if-absent keyed by (exam, student, active).
    async fn create_attempt(&self, attempt: &ExamAttempt) -> Result<CreateOutcome>;

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>>;

    /// All of a student's attempts for one exam, newest first.
    async fn list_attempts(&self, exam_id: &str, student_id: &str) -> Result<Vec<ExamAttempt>>;

    async fn count_attempts(&self, exam_id: &str, student_id: &str) -> Result<u64>;

    /// Atomic upsert keyed by (attempt, question); last write wins.
    async fn upsert_submission(&self, submission: &AnswerSubmission) -> Result<()>;

    async fn list_submissions(&self, attempt_id: &str) -> Result<Vec<AnswerSubmission>>;

    /// Compare-and-set transition out of `InProgress`, writing the terminal
    /// status, finish time and score at most once.
    async fn finish_attempt(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        finished_at: DateTime<Utc>,
        score: i32,
    ) -> Result<FinishOutcome>;
}
