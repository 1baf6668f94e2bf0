// src/models/lesson.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

/// Kind of a question inside a lesson's bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[serde(rename = "mcq")]
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub fn has_options(self) -> bool {
        !matches!(self, QuestionType::ShortAnswer)
    }
}

/// One question of a lesson. Stored inside the `lessons.questions` JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Unique within the lesson.
    pub id: String,

    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub text: String,

    /// Choices for MCQ / true-false. Empty for short answers.
    #[serde(default)]
    pub options: Vec<String>,

    /// Text of the correct option, or the expected short answer.
    pub answer: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Question as served to a student during an attempt (answer hidden).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub points: f64,
}

/// Per-attempt sampling configuration of a lesson's question bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionPool {
    pub enabled: bool,
    /// How many questions of each type to draw per attempt.
    pub distribution: BTreeMap<QuestionType, usize>,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
}

/// Represents the 'lessons' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub questions: Json<Vec<Question>>,
    pub pool: Json<QuestionPool>,
    pub total_points: f64,
    pub time_limit_minutes: Option<i32>,
    pub published: bool,
    pub tags: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Lesson as listed publicly: no question bank, just its size.
#[derive(Debug, Serialize, FromRow)]
pub struct LessonSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub video_url: Option<String>,
    pub total_points: f64,
    pub time_limit_minutes: Option<i32>,
    pub question_count: i32,
    pub tags: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for listing lessons.
#[derive(Debug, Deserialize)]
pub struct LessonListParams {
    /// Tag name filter.
    pub tag: Option<String>,
    /// Title search keyword.
    pub q: Option<String>,
}

/// DTO for creating a lesson.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = validate_url_string))]
    pub video_url: Option<String>,
    #[validate(custom(function = validate_questions))]
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub pool: QuestionPool,
    #[validate(range(min = 0.0, max = 10000.0))]
    #[serde(default = "default_total_points")]
    pub total_points: f64,
    #[validate(range(min = 1, max = 600))]
    pub time_limit_minutes: Option<i32>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// DTO for updating a lesson. Fields are optional; `video_url` and
/// `time_limit_minutes` are cleared by an explicit `null`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(custom(function = validate_url_string))]
    #[serde(default, deserialize_with = "present_or_null")]
    pub video_url: Option<Option<String>>,
    #[validate(custom(function = validate_questions))]
    pub questions: Option<Vec<Question>>,
    pub pool: Option<QuestionPool>,
    #[validate(range(min = 0.0, max = 10000.0))]
    pub total_points: Option<f64>,
    #[validate(range(min = 1, max = 600))]
    #[serde(default, deserialize_with = "present_or_null")]
    pub time_limit_minutes: Option<Option<i32>>,
    pub published: Option<bool>,
    pub tag_ids: Option<Vec<i64>>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present_or_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_total_points() -> f64 {
    100.0
}

fn default_published() -> bool {
    true
}

fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Checks ids are unique and every choice question's answer is one of its options.
pub fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for q in questions {
        if q.id.trim().is_empty() || !seen.insert(q.id.as_str()) {
            return Err(validator::ValidationError::new("duplicate_or_empty_question_id"));
        }
        if q.text.trim().is_empty() || q.text.len() > 5000 {
            return Err(validator::ValidationError::new("invalid_question_text"));
        }
        if q.answer.trim().is_empty() {
            return Err(validator::ValidationError::new("missing_answer"));
        }
        if q.question_type.has_options() {
            if q.options.len() < 2 {
                return Err(validator::ValidationError::new("too_few_options"));
            }
            if !q.options.iter().any(|opt| opt.trim() == q.answer.trim()) {
                return Err(validator::ValidationError::new("answer_not_in_options"));
            }
        }
    }
    Ok(())
}
