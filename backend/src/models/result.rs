// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

/// Outcome of one question inside a graded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_id: String,
    /// What the student submitted; `None` when left blank.
    pub given: Option<String>,
    pub correct_answer: String,
    pub correct: bool,
    pub points: f64,
    pub earned: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Represents the 'results' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizResult {
    pub id: i64,
    pub student_id: i64,
    pub lesson_id: i64,
    pub score: f64,
    #[serde(rename = "totalPoints")]
    pub total_points: f64,
    pub correct_count: i32,
    pub question_count: i32,
    pub answers: Json<Vec<AnswerDetail>>,
    pub time_spent_seconds: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// History row joined with the lesson title.
#[derive(Debug, Serialize, FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub lesson_id: i64,
    pub lesson_title: String,
    pub score: f64,
    #[serde(rename = "totalPoints")]
    pub total_points: f64,
    pub correct_count: i32,
    pub question_count: i32,
    pub time_spent_seconds: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Admin view of a result, with student and lesson names.
#[derive(Debug, Serialize, FromRow)]
pub struct AdminResultEntry {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub lesson_id: i64,
    pub lesson_title: String,
    pub score: f64,
    #[serde(rename = "totalPoints")]
    pub total_points: f64,
    pub correct_count: i32,
    pub question_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregated statistics over a student's attempts.
#[derive(Debug, Serialize, FromRow)]
pub struct HistoryStats {
    pub attempts: i64,
    pub lessons_attempted: i64,
    pub average_percentage: f64,
    pub best_percentage: f64,
}

/// Query parameters for history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Cursor for pagination: the created_at timestamp of the last result in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub lesson_id: Option<i64>,
}

/// Query parameters for the admin result listing.
#[derive(Debug, Deserialize)]
pub struct AdminResultParams {
    pub student_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,
    pub limit: Option<i64>,
}
