//! Auto-grading: a dispatch over question kinds, so new kinds slot in
//! without touching the attempt workflow.

use std::collections::BTreeSet;

use crate::models::answer::Verdict;
use crate::models::question::QuestionKind;

impl QuestionKind {
    /// Grade a submitted answer against this kind's key. Essay answers are
    /// never auto-graded and come back `Pending`.
    pub fn grade(&self, answer: &[String]) -> Verdict {
        match self {
            QuestionKind::SingleChoice { key } | QuestionKind::ShortAnswer { key } => {
                match answer {
                    [only] if normalize(only) == normalize(key) => Verdict::Correct,
                    _ => Verdict::Incorrect,
                }
            }
            QuestionKind::MultipleChoice { keys } => {
                if normalized_set(answer) == normalized_set(keys) {
                    Verdict::Correct
                } else {
                    Verdict::Incorrect
                }
            }
            QuestionKind::Essay => Verdict::Pending,
        }
    }
}

/// Points awarded for a verdict: full value when correct, zero when
/// incorrect, none while pending manual grading.
pub fn awarded_points(verdict: Verdict, points: i32) -> Option<i32> {
    match verdict {
        Verdict::Correct => Some(points),
        Verdict::Incorrect => Some(0),
        Verdict::Pending => None,
    }
}

/// Case-insensitive, trimmed, inner whitespace collapsed to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Order-independent comparison form; duplicate entries are ignored.
fn normalized_set(entries: &[String]) -> BTreeSet<String> {
    entries.iter().map(|e| normalize(e)).collect()
}
