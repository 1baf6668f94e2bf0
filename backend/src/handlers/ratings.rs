// src/handlers/ratings.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::rating::{RateLessonRequest, RatingSummary},
    utils::jwt::AuthStudent,
};

async fn summary(pool: &PgPool, lesson_id: i64) -> Result<RatingSummary, AppError> {
    let summary = sqlx::query_as::<_, RatingSummary>(
        r#"
        SELECT
            $1::BIGINT AS lesson_id,
            COALESCE(ROUND(AVG(rating)::NUMERIC, 2), 0)::FLOAT8 AS average,
            COUNT(*) AS count
        FROM ratings
        WHERE lesson_id = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_one(pool)
    .await?;

    Ok(summary)
}

/// Average rating and count for a lesson.
pub async fn get_ratings(
    State(pool): State<PgPool>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(summary(&pool, lesson_id).await?))
}

/// Creates or replaces the current student's rating of a lesson.
pub async fn rate_lesson(
    State(pool): State<PgPool>,
    student: AuthStudent,
    Path(lesson_id): Path<i64>,
    Json(payload): Json<RateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM lessons WHERE id = $1 AND published = TRUE")
            .bind(lesson_id)
            .fetch_optional(&pool)
            .await?;
    if exists.is_none() {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO ratings (student_id, lesson_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, lesson_id) DO UPDATE SET
            rating = EXCLUDED.rating,
            comment = EXCLUDED.comment,
            created_at = NOW()
        "#,
    )
    .bind(student.id)
    .bind(lesson_id)
    .bind(payload.rating)
    .bind(payload.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()))
    .execute(&pool)
    .await?;

    Ok(Json(summary(&pool, lesson_id).await?))
}
