use std::sync::Arc;

use chrono::{Duration, Utc};
use exam_attempts::models::exam::Exam;
use exam_attempts::models::question::{Question, QuestionKind};
use exam_attempts::models::ExamAttempt;
use exam_attempts::store::memory::MemoryStore;
use exam_attempts::store::AttemptStore;
use exam_attempts::AttemptService;

pub const EXAM_ID: &str = "exam-rust-101";
pub const ESSAY_EXAM_ID: &str = "exam-essay";

/// Memory-store service seeded with a published exam that is currently
/// open: five auto-graded questions worth 20 points each, passing score 60.
pub fn create_test_service() -> (Arc<MemoryStore>, AttemptService) {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    store.insert_exam(open_exam(EXAM_ID), question_set());
    store.insert_exam(essay_exam(), essay_question_set());

    let service = AttemptService::new(store.clone(), store.clone());
    (store, service)
}

pub fn open_exam(exam_id: &str) -> Exam {
    let now = Utc::now();
    Exam {
        id: exam_id.to_string(),
        title: "Rust 101 Midterm".to_string(),
        opens_at: now - Duration::hours(1),
        closes_at: now + Duration::hours(2),
        duration_seconds: 3600,
        passing_score: 60,
        published: true,
    }
}

pub fn question_set() -> Vec<Question> {
    vec![
        question(
            "q-sum",
            1,
            "2 + 2 = ?",
            vec!["3", "4", "5"],
            QuestionKind::SingleChoice {
                key: "4".to_string(),
            },
        ),
        question(
            "q-capital",
            2,
            "Capital of France?",
            vec!["Paris", "Lyon", "Nice"],
            QuestionKind::SingleChoice {
                key: "Paris".to_string(),
            },
        ),
        question(
            "q-search",
            3,
            "Name the O(log n) lookup over a sorted array.",
            vec![],
            QuestionKind::ShortAnswer {
                key: "binary search".to_string(),
            },
        ),
        question(
            "q-primes",
            4,
            "Select every prime.",
            vec!["2", "3", "4", "5"],
            QuestionKind::MultipleChoice {
                keys: vec!["2".to_string(), "3".to_string(), "5".to_string()],
            },
        ),
        question(
            "q-sky",
            5,
            "Color of a clear daytime sky?",
            vec!["blue", "green", "red"],
            QuestionKind::SingleChoice {
                key: "blue".to_string(),
            },
        ),
    ]
}

fn essay_exam() -> Exam {
    let mut exam = open_exam(ESSAY_EXAM_ID);
    exam.title = "Essay Final".to_string();
    exam.passing_score = 20;
    exam
}

fn essay_question_set() -> Vec<Question> {
    vec![
        Question {
            id: "q-essay-choice".to_string(),
            exam_id: ESSAY_EXAM_ID.to_string(),
            sequence: 1,
            prompt: "2 + 2 = ?".to_string(),
            options: vec!["3".to_string(), "4".to_string()],
            kind: QuestionKind::SingleChoice {
                key: "4".to_string(),
            },
            points: 20,
        },
        Question {
            id: "q-essay-free".to_string(),
            exam_id: ESSAY_EXAM_ID.to_string(),
            sequence: 2,
            prompt: "Discuss ownership and borrowing.".to_string(),
            options: vec![],
            kind: QuestionKind::Essay,
            points: 40,
        },
    ]
}

fn question(
    id: &str,
    sequence: u32,
    prompt: &str,
    options: Vec<&str>,
    kind: QuestionKind,
) -> Question {
    Question {
        id: id.to_string(),
        exam_id: EXAM_ID.to_string(),
        sequence,
        prompt: prompt.to_string(),
        options: options.into_iter().map(|o| o.to_string()).collect(),
        kind,
        points: 20,
    }
}

/// Seed an attempt whose deadline already passed while it is still stored as
/// in progress, as if the student walked away mid-exam.
pub async fn seed_overdue_attempt(store: &MemoryStore, student_id: &str) -> ExamAttempt {
    let now = Utc::now();
    let attempt = ExamAttempt::new(
        EXAM_ID,
        student_id,
        now - Duration::hours(2),
        now - Duration::hours(1),
    );
    store
        .create_attempt(&attempt)
        .await
        .expect("failed to seed overdue attempt");
    attempt
}

pub fn answer(entries: &[&str]) -> exam_attempts::models::answer::SubmitAnswerRequest {
    exam_attempts::models::answer::SubmitAnswerRequest {
        answer: entries.iter().map(|e| e.to_string()).collect(),
    }
}
