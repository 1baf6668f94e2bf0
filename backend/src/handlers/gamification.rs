// src/handlers/gamification.rs

use axum::{Json, extract::State, response::IntoResponse};
use sqlx::PgPool;

use crate::{
    config::LEADERBOARD_LIMIT,
    error::AppError,
    models::{
        gamification::{AchievementRow, EarnedAchievement, GamificationProfile, LeaderboardEntry},
        student::{STUDENT_COLUMNS, Student},
    },
    services::gamification::{find_achievement, level_for_xp, xp_to_next_level},
    utils::jwt::AuthStudent,
};

/// XP, level, streaks and earned achievements of the current student.
pub async fn get_profile(
    State(pool): State<PgPool>,
    student: AuthStudent,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
    let row = sqlx::query_as::<_, Student>(&sql)
        .bind(student.id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    let achievements = sqlx::query_as::<_, AchievementRow>(
        "SELECT code, earned_at FROM student_achievements WHERE student_id = $1 ORDER BY earned_at",
    )
    .bind(student.id)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .filter_map(|row| {
        // Codes retired from the catalogue are hidden.
        find_achievement(&row.code).map(|a| EarnedAchievement {
            code: row.code,
            title: a.title,
            description: a.description,
            earned_at: row.earned_at,
        })
    })
    .collect();

    Ok(Json(GamificationProfile {
        xp: row.xp,
        level: level_for_xp(row.xp),
        xp_to_next_level: xp_to_next_level(row.xp),
        current_streak: row.current_streak,
        longest_streak: row.longest_streak,
        last_activity_date: row.last_activity_date,
        achievements,
    }))
}

/// Top approved students by XP.
pub async fn get_leaderboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let mut leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT id AS student_id, name, xp, current_streak
        FROM students
        WHERE approved = TRUE AND xp > 0
        ORDER BY xp DESC, id ASC
        LIMIT $1
        "#,
    )
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::from(e)
    })?;

    for entry in &mut leaderboard {
        entry.level = level_for_xp(entry.xp);
    }

    Ok(Json(leaderboard))
}
