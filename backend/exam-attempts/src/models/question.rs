use serde::{Deserialize, Serialize};

use crate::models::answer::AnswerSubmission;

/// A question as stored, including the answer key for auto-gradable kinds.
/// Only [`QuestionView`] ever crosses the student-facing boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub exam_id: String,
    /// Fixed per-exam ordering; question sets are always served sorted by
    /// this field, never re-shuffled per call.
    pub sequence: u32,
    pub prompt: String,
    /// Presented options for choice questions, empty otherwise.
    pub options: Vec<String>,
    pub kind: QuestionKind,
    pub points: i32,
}

/// Question kind, carrying the answer key where one exists. Grading is a
/// dispatch over these variants (see `scoring`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice { key: String },
    MultipleChoice { keys: Vec<String> },
    ShortAnswer { key: String },
    Essay,
}

impl QuestionKind {
    pub fn label(&self) -> QuestionKindLabel {
        match self {
            QuestionKind::SingleChoice { .. } => QuestionKindLabel::SingleChoice,
            QuestionKind::MultipleChoice { .. } => QuestionKindLabel::MultipleChoice,
            QuestionKind::ShortAnswer { .. } => QuestionKindLabel::ShortAnswer,
            QuestionKind::Essay => QuestionKindLabel::Essay,
        }
    }
}

/// Key-free kind tag, safe to expose to students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKindLabel {
    SingleChoice,
    MultipleChoice,
    ShortAnswer,
    Essay,
}

/// Student-facing projection of a question: the answer key is stripped and
/// the student's prior submission (if any) is attached.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: String,
    pub sequence: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub kind: QuestionKindLabel,
    pub points: i32,
    pub submitted: Option<SubmittedAnswerView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedAnswerView {
    pub answer: Vec<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    pub fn view(&self, prior: Option<&AnswerSubmission>) -> QuestionView {
        QuestionView {
            id: self.id.clone(),
            sequence: self.sequence,
            prompt: self.prompt.clone(),
            options: self.options.clone(),
            kind: self.kind.label(),
            points: self.points,
            submitted: prior.map(|s| SubmittedAnswerView {
                answer: s.answer.clone(),
                submitted_at: s.submitted_at,
            }),
        }
    }
}
