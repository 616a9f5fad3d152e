use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::error::AttemptError;
use crate::models::answer::{AnswerSubmission, SubmitAnswerRequest, SubmitAnswerResponse};
use crate::models::question::QuestionView;
use crate::models::result::{round_two, ExamResult, ProgressReport, QuestionOutcome};
use crate::models::{AttemptStatus, ExamAttempt};
use crate::scoring::awarded_points;
use crate::store::{AttemptStore, CreateOutcome, ExamStore, FinishOutcome};

/// The student exam-attempt workflow: start, fetch questions, submit
/// answers, finish, read result and progress. All atomicity is delegated to
/// the stores; all expiry is derived read-time from stored metadata and
/// materialized lazily, never scheduled.
pub struct AttemptService {
    exams: Arc<dyn ExamStore>,
    attempts: Arc<dyn AttemptStore>,
    /// Attempts per (student, exam) allowed by configuration; 0 = unlimited.
    max_attempts_per_exam: u32,
}

impl AttemptService {
    pub fn new(exams: Arc<dyn ExamStore>, attempts: Arc<dyn AttemptStore>) -> Self {
        Self {
            exams,
            attempts,
            max_attempts_per_exam: 0,
        }
    }

    pub fn with_attempt_limit(mut self, max_attempts_per_exam: u32) -> Self {
        self.max_attempts_per_exam = max_attempts_per_exam;
        self
    }

    /// Start a new attempt. The store-level insert-if-absent is what rejects
    /// concurrent duplicate starts; there is no exists-then-insert here.
    pub async fn start_attempt(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> Result<ExamAttempt, AttemptError> {
        let exam = self
            .exams
            .get_exam(exam_id)
            .await?
            .ok_or_else(|| AttemptError::ExamNotFound(exam_id.to_string()))?;

        let now = Utc::now();
        if !exam.is_open(now) {
            tracing::warn!(
                "Rejected start outside exam window: exam={}, student={}",
                exam_id,
                student_id
            );
            return Err(AttemptError::ExamNotEligible(exam_id.to_string()));
        }

        if self.max_attempts_per_exam > 0 {
            let taken = self.attempts.count_attempts(exam_id, student_id).await?;
            if taken >= u64::from(self.max_attempts_per_exam) {
                return Err(AttemptError::AttemptLimitReached {
                    exam_id: exam_id.to_string(),
                    limit: self.max_attempts_per_exam,
                });
            }
        }

        let attempt = ExamAttempt::new(exam_id, student_id, now, exam.attempt_deadline(now));
        match self.attempts.create_attempt(&attempt).await? {
            CreateOutcome::Created => {
                tracing::info!(
                    "Attempt started: id={}, exam={}, student={}, ends_at={}",
                    attempt.id,
                    exam_id,
                    student_id,
                    attempt.ends_at
                );
                Ok(attempt)
            }
            CreateOutcome::ActiveAttemptExists => Err(AttemptError::AttemptAlreadyActive {
                exam_id: exam_id.to_string(),
                student_id: student_id.to_string(),
            }),
        }
    }

    /// Question set in stable sequence order, each with the student's prior
    /// submission attached and the answer key stripped.
    pub async fn get_questions(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<Vec<QuestionView>, AttemptError> {
        let attempt = self.load_owned_attempt(attempt_id, student_id).await?;
        let attempt = self.materialize_expiry(attempt).await?;
        self.require_in_progress(&attempt)?;

        let questions = self.exams.list_questions(&attempt.exam_id).await?;
        let prior = self.submissions_by_question(attempt_id).await?;

        Ok(questions
            .iter()
            .map(|q| q.view(prior.get(&q.id)))
            .collect())
    }

    /// Upsert one answer. Grading happens immediately for auto-gradable
    /// kinds; essays are stored pending. Past-deadline calls materialize the
    /// expiry and are rejected, never silently accepted.
    pub async fn submit_answer(
        &self,
        attempt_id: &str,
        student_id: &str,
        question_id: &str,
        request: &SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse, AttemptError> {
        request.validate()?;
        if request.answer.iter().all(|entry| entry.trim().is_empty()) {
            return Err(AttemptError::InvalidAnswer(
                "answer entries are blank".to_string(),
            ));
        }

        let attempt = self.load_owned_attempt(attempt_id, student_id).await?;
        let attempt = self.materialize_expiry(attempt).await?;
        self.require_in_progress(&attempt)?;

        let questions = self.exams.list_questions(&attempt.exam_id).await?;
        let question = questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AttemptError::UnknownQuestion {
                exam_id: attempt.exam_id.clone(),
                question_id: question_id.to_string(),
            })?;

        let now = Utc::now();
        let verdict = question.kind.grade(&request.answer);
        let points = awarded_points(verdict, question.points);
        let submission = AnswerSubmission::new(
            attempt_id,
            question_id,
            request.answer.clone(),
            verdict,
            points,
            now,
        );
        self.attempts.upsert_submission(&submission).await?;

        tracing::info!(
            "Answer submitted: attempt={}, question={}, verdict={:?}",
            attempt_id,
            question_id,
            verdict
        );

        Ok(SubmitAnswerResponse {
            question_id: question_id.to_string(),
            verdict,
            awarded_points: points,
            submitted_at: now,
        })
    }

    /// Finish the attempt and compute its score. Idempotent: a terminal
    /// attempt is served as-is, never rescored, so a concurrent double
    /// finish returns the same result on both calls.
    pub async fn finish_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ExamResult, AttemptError> {
        let attempt = self.load_owned_attempt(attempt_id, student_id).await?;

        if attempt.status.is_terminal() {
            return self.build_result(&attempt).await;
        }

        let now = Utc::now();
        if attempt.effective_status(now) == AttemptStatus::Expired {
            let attempt = self.materialize_expiry(attempt).await?;
            return self.build_result(&attempt).await;
        }

        let score = self.stored_score(attempt_id).await?;
        let finished_at = std::cmp::min(now, attempt.ends_at);
        let attempt = match self
            .attempts
            .finish_attempt(attempt_id, AttemptStatus::Finished, finished_at, score)
            .await?
        {
            FinishOutcome::Transitioned(row) => {
                tracing::info!(
                    "Attempt finished: id={}, student={}, score={}",
                    attempt_id,
                    student_id,
                    score
                );
                row
            }
            // Lost a concurrent race; the winner's result stands.
            FinishOutcome::AlreadyTerminal(row) => row,
        };
        self.build_result(&attempt).await
    }

    /// Result view over a terminal attempt, materializing lazy expiry first.
    pub async fn get_result(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ExamResult, AttemptError> {
        let attempt = self.load_owned_attempt(attempt_id, student_id).await?;
        let attempt = self.materialize_expiry(attempt).await?;
        if !attempt.status.is_terminal() {
            return Err(AttemptError::AttemptNotFinished(attempt_id.to_string()));
        }
        self.build_result(&attempt).await
    }

    /// Answered-vs-total progress with remaining time; served for live and
    /// terminal attempts alike.
    pub async fn get_progress(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ProgressReport, AttemptError> {
        let attempt = self.load_owned_attempt(attempt_id, student_id).await?;
        let attempt = self.materialize_expiry(attempt).await?;

        let questions = self.exams.list_questions(&attempt.exam_id).await?;
        let prior = self.submissions_by_question(attempt_id).await?;

        let total = questions.len() as u32;
        let answered = questions.iter().filter(|q| prior.contains_key(&q.id)).count() as u32;
        let percent = if total == 0 {
            0.0
        } else {
            round_two(f64::from(answered) * 100.0 / f64::from(total))
        };

        Ok(ProgressReport {
            attempt_id: attempt_id.to_string(),
            status: attempt.status,
            answered_questions: answered,
            unanswered_questions: total - answered,
            total_questions: total,
            percent_complete: percent,
            remaining_seconds: attempt.remaining_seconds(Utc::now()),
        })
    }

    /// The student's attempt history for one exam, newest first. Overdue
    /// rows are materialized on the way out.
    pub async fn list_attempts(
        &self,
        exam_id: &str,
        student_id: &str,
    ) -> Result<Vec<ExamAttempt>, AttemptError> {
        let rows = self.attempts.list_attempts(exam_id, student_id).await?;
        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            attempts.push(self.materialize_expiry(row).await?);
        }
        Ok(attempts)
    }

    async fn load_owned_attempt(
        &self,
        attempt_id: &str,
        student_id: &str,
    ) -> Result<ExamAttempt, AttemptError> {
        let attempt = self
            .attempts
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| AttemptError::AttemptNotFound(attempt_id.to_string()))?;

        if attempt.student_id != student_id {
            tracing::warn!(
                "Ownership check failed: attempt={}, owner={}, caller={}",
                attempt_id,
                attempt.student_id,
                student_id
            );
            return Err(AttemptError::AttemptNotOwned(attempt_id.to_string()));
        }
        Ok(attempt)
    }

    /// Materialize the time-driven transition for an attempt whose deadline
    /// has passed while it was still stored as in progress. Scoring is the
    /// same computation as an explicit finish; the finish time is pinned to
    /// the deadline.
    async fn materialize_expiry(
        &self,
        attempt: ExamAttempt,
    ) -> Result<ExamAttempt, AttemptError> {
        let now = Utc::now();
        if attempt.status != AttemptStatus::InProgress
            || attempt.effective_status(now) != AttemptStatus::Expired
        {
            return Ok(attempt);
        }

        let score = self.stored_score(&attempt.id).await?;
        let outcome = self
            .attempts
            .finish_attempt(&attempt.id, AttemptStatus::Expired, attempt.ends_at, score)
            .await?;
        let attempt = match outcome {
            FinishOutcome::Transitioned(row) => {
                tracing::info!(
                    "Attempt expired lazily: id={}, score={}",
                    row.id,
                    score
                );
                row
            }
            FinishOutcome::AlreadyTerminal(row) => row,
        };
        Ok(attempt)
    }

    fn require_in_progress(&self, attempt: &ExamAttempt) -> Result<(), AttemptError> {
        match attempt.status {
            AttemptStatus::InProgress => Ok(()),
            AttemptStatus::Expired => Err(AttemptError::AttemptExpired(attempt.id.clone())),
            AttemptStatus::Finished => Err(AttemptError::AttemptNotActive {
                attempt_id: attempt.id.clone(),
                status: attempt.status.as_str(),
            }),
        }
    }

    async fn submissions_by_question(
        &self,
        attempt_id: &str,
    ) -> Result<HashMap<String, AnswerSubmission>, AttemptError> {
        let rows = self.attempts.list_submissions(attempt_id).await?;
        Ok(rows
            .into_iter()
            .map(|s| (s.question_id.clone(), s))
            .collect())
    }

    /// Total score over the stored submissions: graded rows contribute their
    /// awarded points, pending essays contribute zero until graded manually.
    async fn stored_score(&self, attempt_id: &str) -> Result<i32, AttemptError> {
        let rows = self.attempts.list_submissions(attempt_id).await?;
        Ok(rows
            .iter()
            .filter_map(|s| s.awarded_points)
            .sum())
    }

    async fn build_result(&self, attempt: &ExamAttempt) -> Result<ExamResult, AttemptError> {
        let exam = self
            .exams
            .get_exam(&attempt.exam_id)
            .await?
            .ok_or_else(|| AttemptError::ExamNotFound(attempt.exam_id.clone()))?;
        let questions = self.exams.list_questions(&attempt.exam_id).await?;
        let prior = self.submissions_by_question(&attempt.id).await?;

        let breakdown = questions
            .iter()
            .map(|q| {
                let submission = prior.get(&q.id);
                QuestionOutcome {
                    question_id: q.id.clone(),
                    sequence: q.sequence,
                    points_possible: q.points,
                    verdict: submission.map(|s| s.verdict),
                    awarded_points: submission.and_then(|s| s.awarded_points),
                }
            })
            .collect();

        let score = attempt.score.unwrap_or(0);
        Ok(ExamResult {
            attempt_id: attempt.id.clone(),
            exam_id: attempt.exam_id.clone(),
            student_id: attempt.student_id.clone(),
            status: attempt.status,
            score,
            passed: score >= exam.passing_score,
            started_at: attempt.started_at,
            finished_at: attempt.finished_at.unwrap_or(attempt.ends_at),
            breakdown,
        })
    }
}
