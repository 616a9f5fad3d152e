use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::answer::Verdict;
use crate::models::AttemptStatus;

/// Read-only view over a terminal attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub attempt_id: String,
    pub exam_id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub score: i32,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub breakdown: Vec<QuestionOutcome>,
}

/// Per-question line of the result breakdown, in exam sequence order.
/// `verdict` is None for questions the student never answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    pub sequence: u32,
    pub points_possible: i32,
    pub verdict: Option<Verdict>,
    pub awarded_points: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub attempt_id: String,
    pub status: AttemptStatus,
    pub answered_questions: u32,
    pub unanswered_questions: u32,
    pub total_questions: u32,
    /// Percentage of questions answered, rounded half-up to two decimals.
    pub percent_complete: f64,
    /// Seconds left until the attempt deadline; zero once terminal or past
    /// the deadline.
    pub remaining_seconds: i64,
}

/// Round half-up to two decimal places.
pub fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
