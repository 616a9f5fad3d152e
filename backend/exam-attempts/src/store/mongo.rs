//! MongoDB-backed production stores. Atomicity lives at the database: a
//! partial unique index rejects duplicate active attempts, submission
//! upserts are keyed replaces, and the finish transition is a filtered
//! find-and-update. Transient failures are retried here with bounded
//! backoff; callers never retry.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::options::{
    FindOneAndUpdateOptions, FindOptions, IndexOptions, ReplaceOptions, ReturnDocument,
};
use mongodb::{Collection, Database, IndexModel};

use crate::models::answer::AnswerSubmission;
use crate::models::exam::Exam;
use crate::models::question::Question;
use crate::models::{AttemptStatus, ExamAttempt};
use crate::store::{AttemptStore, CreateOutcome, ExamStore, FinishOutcome};
use crate::utils::retry::{with_retries, RetryPolicy};

const EXAMS_COLLECTION: &str = "exams";
const QUESTIONS_COLLECTION: &str = "questions";
const ATTEMPTS_COLLECTION: &str = "attempts";
const SUBMISSIONS_COLLECTION: &str = "submissions";

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create the indexes the store's guarantees depend on. Idempotent; run
    /// once at startup.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_active = IndexModel::builder()
            .keys(doc! { "exam_id": 1, "student_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "status": "in_progress" })
                    .build(),
            )
            .build();
        self.attempts()
            .create_index(unique_active)
            .await
            .context("Failed to create unique active-attempt index")?;

        let by_attempt = IndexModel::builder()
            .keys(doc! { "attempt_id": 1 })
            .build();
        self.submissions()
            .create_index(by_attempt)
            .await
            .context("Failed to create submission attempt index")?;

        tracing::info!("MongoDB attempt store indexes ensured");
        Ok(())
    }

    fn exams(&self) -> Collection<Exam> {
        self.db.collection(EXAMS_COLLECTION)
    }

    fn questions(&self) -> Collection<Question> {
        self.db.collection(QUESTIONS_COLLECTION)
    }

    fn attempts(&self) -> Collection<ExamAttempt> {
        self.db.collection(ATTEMPTS_COLLECTION)
    }

    fn submissions(&self) -> Collection<AnswerSubmission> {
        self.db.collection(SUBMISSIONS_COLLECTION)
    }
}

/// The uniqueness conflict surfaced by the active-attempt index.
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) =
        *error.kind
    {
        return we.code == 11000;
    }
    false
}

#[async_trait]
impl ExamStore for MongoStore {
    async fn get_exam(&self, exam_id: &str) -> Result<Option<Exam>> {
        let collection = self.exams();
        with_retries(RetryPolicy::default(), || async {
            collection.find_one(doc! { "_id": exam_id }).await
        })
        .await
        .context("Failed to query exams collection")
    }

    async fn list_questions(&self, exam_id: &str) -> Result<Vec<Question>> {
        let collection = self.questions();
        let cursor = with_retries(RetryPolicy::default(), || async {
            collection
                .find(doc! { "exam_id": exam_id })
                .with_options(FindOptions::builder().sort(doc! { "sequence": 1 }).build())
                .await
        })
        .await
        .context("Failed to query questions collection")?;

        cursor
            .try_collect()
            .await
            .context("Failed to read question cursor")
    }
}

#[async_trait]
impl AttemptStore for MongoStore {
    async fn create_attempt(&self, attempt: &ExamAttempt) -> Result<CreateOutcome> {
        let collection = self.attempts();
        let outcome = with_retries(RetryPolicy::default(), || async {
            match collection.insert_one(attempt).await {
                Ok(_) => Ok(CreateOutcome::Created),
                Err(e) if is_duplicate_key(&e) => Ok(CreateOutcome::ActiveAttemptExists),
                Err(e) => Err(e),
            }
        })
        .await
        .context("Failed to insert attempt")?;

        if matches!(outcome, CreateOutcome::Created) {
            tracing::info!(
                "Attempt created: id={}, exam={}, student={}",
                attempt.id,
                attempt.exam_id,
                attempt.student_id
            );
        }
        Ok(outcome)
    }

    async fn get_attempt(&self, attempt_id: &str) -> Result<Option<ExamAttempt>> {
        let collection = self.attempts();
        with_retries(RetryPolicy::default(), || async {
            collection.find_one(doc! { "_id": attempt_id }).await
        })
        .await
        .context("Failed to query attempts collection")
    }

    async fn list_attempts(&self, exam_id: &str, student_id: &str) -> Result<Vec<ExamAttempt>> {
        let collection = self.attempts();
        let cursor = with_retries(RetryPolicy::default(), || async {
            collection
                .find(doc! { "exam_id": exam_id, "student_id": student_id })
                .with_options(
                    FindOptions::builder()
                        .sort(doc! { "started_at": -1 })
                        .build(),
                )
                .await
        })
        .await
        .context("Failed to query attempt history")?;

        cursor
            .try_collect()
            .await
            .context("Failed to read attempt cursor")
    }

    async fn count_attempts(&self, exam_id: &str, student_id: &str) -> Result<u64> {
        let collection = self.attempts();
        with_retries(RetryPolicy::default(), || async {
            collection
                .count_documents(doc! { "exam_id": exam_id, "student_id": student_id })
                .await
        })
        .await
        .context("Failed to count attempts")
    }

    async fn upsert_submission(&self, submission: &AnswerSubmission) -> Result<()> {
        let collection = self.submissions();
        with_retries(RetryPolicy::aggressive(), || async {
            collection
                .replace_one(doc! { "_id": &submission.id }, submission)
                .with_options(ReplaceOptions::builder().upsert(true).build())
                .await
        })
        .await
        .context("Failed to upsert submission")?;

        tracing::debug!(
            "Submission upserted: attempt={}, question={}",
            submission.attempt_id,
            submission.question_id
        );
        Ok(())
    }

    async fn list_submissions(&self, attempt_id: &str) -> Result<Vec<AnswerSubmission>> {
        let collection = self.submissions();
        let cursor = with_retries(RetryPolicy::default(), || async {
            collection
                .find(doc! { "attempt_id": attempt_id })
                .with_options(
                    FindOptions::builder()
                        .sort(doc! { "submitted_at": 1 })
                        .build(),
                )
                .await
        })
        .await
        .context("Failed to query submissions collection")?;

        cursor
            .try_collect()
            .await
            .context("Failed to read submission cursor")
    }

    async fn finish_attempt(
        &self,
        attempt_id: &str,
        status: AttemptStatus,
        finished_at: DateTime<Utc>,
        score: i32,
    ) -> Result<FinishOutcome> {
        let collection = self.attempts();
        // Filtering on the active status makes this a compare-and-set: only
        // one concurrent caller ever matches.
        let filter = doc! {
            "_id": attempt_id,
            "status": AttemptStatus::InProgress.as_str(),
        };
        let update = doc! {
            "$set": {
                "status": status.as_str(),
                "finished_at": mongodb::bson::to_bson(&finished_at)
                    .context("Failed to encode finish time")?,
                "score": score,
            }
        };

        let updated = with_retries(RetryPolicy::aggressive(), || async {
            collection
                .find_one_and_update(filter.clone(), update.clone())
                .with_options(
                    FindOneAndUpdateOptions::builder()
                        .return_document(ReturnDocument::After)
                        .build(),
                )
                .await
        })
        .await
        .context("Failed to finish attempt")?;

        if let Some(row) = updated {
            tracing::info!(
                "Attempt finished: id={}, status={}, score={}",
                attempt_id,
                status.as_str(),
                score
            );
            return Ok(FinishOutcome::Transitioned(row));
        }

        // Lost the CAS or the attempt never existed; a read disambiguates.
        let existing = self
            .get_attempt(attempt_id)
            .await?
            .ok_or_else(|| anyhow!("attempt {} not found in store", attempt_id))?;
        if existing.status.is_terminal() {
            Ok(FinishOutcome::AlreadyTerminal(existing))
        } else {
            Err(anyhow!(
                "attempt {} could not be transitioned out of in_progress",
                attempt_id
            ))
        }
    }
}
