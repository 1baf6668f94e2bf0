// src/models/ai.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::lesson::Question;

/// What the formatter should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    /// A JSON array of quiz questions.
    #[default]
    Questions,
    /// Cleaned-up Markdown text.
    Cleanup,
}

impl FormatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatMode::Questions => "questions",
            FormatMode::Cleanup => "cleanup",
        }
    }
}

/// DTO for formatting pasted text.
#[derive(Debug, Deserialize, Validate)]
pub struct FormatTextRequest {
    #[validate(length(min = 1, max = 200000, message = "Text must be between 1 and 200000 characters."))]
    pub text: String,
    #[serde(default)]
    pub mode: FormatMode,
}

/// Result of a formatter call.
#[derive(Debug, Clone, Serialize)]
pub struct FormatResponse {
    pub success: bool,
    pub mode: FormatMode,
    /// Raw model output.
    pub text: String,
    /// Parsed questions, present in `questions` mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    pub cached: bool,
}

/// Snapshot of AI response cache counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
    pub hit_rate: f64,
}

/// Represents the 'ai_interactions' table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AiInteraction {
    pub id: i64,
    pub mode: String,
    pub input_chars: i32,
    pub output_chars: i32,
    pub cached: bool,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
