use thiserror::Error;

/// Typed failures of the attempt workflow. Every variant maps to a stable
/// [`ErrorKind`] that the (out-of-scope) transport layer can translate to a
/// status code; the message carries the human-readable detail.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("exam {0} not found")]
    ExamNotFound(String),

    #[error("attempt {0} not found")]
    AttemptNotFound(String),

    #[error("exam {0} is not open for attempts")]
    ExamNotEligible(String),

    #[error("student {student_id} already has an active attempt for exam {exam_id}")]
    AttemptAlreadyActive {
        exam_id: String,
        student_id: String,
    },

    #[error("attempt limit of {limit} reached for exam {exam_id}")]
    AttemptLimitReached { exam_id: String, limit: u32 },

    #[error("attempt {0} belongs to a different student")]
    AttemptNotOwned(String),

    #[error("attempt {attempt_id} is {status}, not in progress")]
    AttemptNotActive {
        attempt_id: String,
        status: &'static str,
    },

    #[error("attempt {0} deadline has passed")]
    AttemptExpired(String),

    #[error("attempt {0} is still in progress")]
    AttemptNotFinished(String),

    #[error("question {question_id} does not belong to exam {exam_id}")]
    UnknownQuestion {
        exam_id: String,
        question_id: String,
    },

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AttemptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptError::ExamNotFound(_) | AttemptError::AttemptNotFound(_) => ErrorKind::NotFound,
            AttemptError::AttemptNotOwned(_) => ErrorKind::Forbidden,
            AttemptError::ExamNotEligible(_)
            | AttemptError::AttemptNotActive { .. }
            | AttemptError::AttemptNotFinished(_) => ErrorKind::InvalidState,
            AttemptError::AttemptExpired(_) => ErrorKind::Expired,
            AttemptError::AttemptAlreadyActive { .. }
            | AttemptError::AttemptLimitReached { .. } => ErrorKind::Conflict,
            AttemptError::UnknownQuestion { .. } | AttemptError::InvalidAnswer(_) => {
                ErrorKind::Validation
            }
            AttemptError::Store(_) => ErrorKind::Store,
        }
    }
}

impl From<validator::ValidationErrors> for AttemptError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AttemptError::InvalidAnswer(errors.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidState,
    Expired,
    Validation,
    Conflict,
    Store,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Expired => "expired",
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Store => "store",
        }
    }
}
