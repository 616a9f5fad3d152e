use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    /// One entry for single-choice and written answers, the selected option
    /// set for multiple-choice.
    #[validate(length(min = 1, message = "answer must not be empty"))]
    pub answer: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub question_id: String,
    pub verdict: Verdict,
    pub awarded_points: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

/// One stored submission per (attempt, question); a later submission for the
/// same pair overwrites the earlier one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerSubmission {
    #[serde(rename = "_id")]
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub answer: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub verdict: Verdict,
    /// Full question points when correct, zero when incorrect, None while a
    /// manually graded answer is still pending.
    pub awarded_points: Option<i32>,
}

impl AnswerSubmission {
    pub fn new(
        attempt_id: &str,
        question_id: &str,
        answer: Vec<String>,
        verdict: Verdict,
        awarded_points: Option<i32>,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}:{}", attempt_id, question_id),
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            answer,
            submitted_at,
            verdict,
            awarded_points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Stored ungraded; resolved by manual grading outside this crate.
    Pending,
}
