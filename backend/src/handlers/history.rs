// src/handlers/history.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::result::{HistoryEntry, HistoryParams, HistoryStats, QuizResult},
    utils::jwt::AuthStudent,
};

/// Lists the current student's results, newest first, with cursor pagination.
pub async fn list_history(
    State(pool): State<PgPool>,
    student: AuthStudent,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let entries = sqlx::query_as::<_, HistoryEntry>(
        r#"
        SELECT
            r.id, r.lesson_id, l.title AS lesson_title,
            r.score, r.total_points, r.correct_count, r.question_count,
            r.time_spent_seconds, r.created_at
        FROM results r
        JOIN lessons l ON l.id = r.lesson_id
        WHERE r.student_id = $1
          AND ($2::TIMESTAMPTZ IS NULL OR r.created_at < $2)
          AND ($3::BIGINT IS NULL OR r.lesson_id = $3)
        ORDER BY r.created_at DESC
        LIMIT $4
        "#,
    )
    .bind(student.id)
    .bind(params.cursor)
    .bind(params.lesson_id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

/// Attempt count, distinct lessons, average and best percentage.
pub async fn history_stats(
    State(pool): State<PgPool>,
    student: AuthStudent,
) -> Result<impl IntoResponse, AppError> {
    let stats = sqlx::query_as::<_, HistoryStats>(
        r#"
        SELECT
            COUNT(*) AS attempts,
            COUNT(DISTINCT lesson_id) AS lessons_attempted,
            COALESCE(ROUND(AVG(score / NULLIF(total_points, 0) * 100)::NUMERIC, 2), 0)::FLOAT8 AS average_percentage,
            COALESCE(ROUND(MAX(score / NULLIF(total_points, 0) * 100)::NUMERIC, 2), 0)::FLOAT8 AS best_percentage
        FROM results
        WHERE student_id = $1
        "#,
    )
    .bind(student.id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(stats))
}

/// One of the current student's results with per-question details.
pub async fn get_result(
    State(pool): State<PgPool>,
    student: AuthStudent,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, QuizResult>(
        r#"
        SELECT id, student_id, lesson_id, score, total_points, correct_count, question_count,
               answers, time_spent_seconds, created_at
        FROM results
        WHERE id = $1 AND student_id = $2
        "#,
    )
    .bind(id)
    .bind(student.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Result not found".to_string()))?;

    Ok(Json(result))
}
