// src/models/gamification.rs

use serde::Serialize;
use sqlx::FromRow;

/// An achievement a student has earned.
#[derive(Debug, Clone, Serialize)]
pub struct EarnedAchievement {
    pub code: String,
    pub title: &'static str,
    pub description: &'static str,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, FromRow)]
pub struct AchievementRow {
    pub code: String,
    pub earned_at: chrono::DateTime<chrono::Utc>,
}

/// Gamification profile of the logged-in student.
#[derive(Debug, Serialize)]
pub struct GamificationProfile {
    pub xp: i64,
    pub level: i64,
    /// XP still needed to reach the next level.
    pub xp_to_next_level: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<chrono::NaiveDate>,
    pub achievements: Vec<EarnedAchievement>,
}

/// Aggregated struct for displaying the leaderboard.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub student_id: i64,
    pub name: String,
    pub xp: i64,
    pub current_streak: i32,
    #[sqlx(skip)]
    pub level: i64,
}

/// Counters used to decide which achievements a student has unlocked.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct StudentProgress {
    pub quiz_count: i64,
    pub perfect_count: i64,
}
