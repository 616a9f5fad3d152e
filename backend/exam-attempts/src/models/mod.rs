use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One student's instance of taking one exam. Soft-retained for history,
/// never deleted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamAttempt {
    #[serde(rename = "_id")]
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    /// started_at + exam duration, capped by the exam closing time.
    pub ends_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
}

/// Stored lifecycle state. "Not started" is virtual: no record exists before
/// the attempt is started. Status only moves forward: `InProgress` to
/// `Finished` (explicit finish) or `InProgress` to `Expired` (time-driven,
/// materialized lazily on read).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Finished,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Finished => "finished",
            AttemptStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl ExamAttempt {
    pub fn new(
        exam_id: &str,
        student_id: &str,
        started_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            student_id: student_id.to_string(),
            status: AttemptStatus::InProgress,
            started_at,
            ends_at,
            finished_at: None,
            score: None,
        }
    }

    /// The single place where stored status and the deadline are combined.
    /// An attempt stored as `InProgress` whose deadline has passed reads as
    /// `Expired` here even before the transition is materialized.
    pub fn effective_status(&self, now: DateTime<Utc>) -> AttemptStatus {
        match self.status {
            AttemptStatus::InProgress if now > self.ends_at => AttemptStatus::Expired,
            status => status,
        }
    }

    /// Seconds left until the deadline, clamped at zero. Zero for terminal
    /// attempts.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        if self.status.is_terminal() {
            return 0;
        }
        (self.ends_at - now).num_seconds().max(0)
    }
}

pub mod answer;
pub mod exam;
pub mod question;
pub mod result;
