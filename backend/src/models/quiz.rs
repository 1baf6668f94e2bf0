// src/models/quiz.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{gamification::EarnedAchievement, lesson::PublicQuestion, result::AnswerDetail};

/// DTO for returning a started attempt.
#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub lesson_id: i64,
    pub title: String,
    pub questions: Vec<PublicQuestion>,
    #[serde(rename = "totalPoints")]
    pub total_points: f64,
    pub attempt_token: String,
    pub expires_in: u64, // seconds
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    /// The token received when the attempt was started.
    pub attempt_token: String,

    /// Key: question id, value: the student's answer.
    pub answers: HashMap<String, String>,

    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuizResponse {
    pub success: bool,
    pub result_id: i64,
    pub score: f64,
    #[serde(rename = "totalPoints")]
    pub total_points: f64,
    pub percentage: f64,
    pub correct_count: usize,
    pub question_count: usize,
    pub details: Vec<AnswerDetail>,
    pub xp_earned: i64,
    pub total_xp: i64,
    pub level: i64,
    pub current_streak: i32,
    pub new_achievements: Vec<EarnedAchievement>,
}
