use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Exam metadata as read from the exam store. Never mutated by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
    pub duration_seconds: u32,
    pub passing_score: i32,
    pub published: bool,
}

impl Exam {
    /// Whether a new attempt may be started at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.published && now >= self.opens_at && now < self.closes_at
    }

    /// Deadline for an attempt started at `started_at`: the duration limit,
    /// capped by the exam's closing time.
    pub fn attempt_deadline(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        let by_duration = started_at + Duration::seconds(i64::from(self.duration_seconds));
        std::cmp::min(by_duration, self.closes_at)
    }
}
