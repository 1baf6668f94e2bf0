// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        lesson::{CreateLessonRequest, Lesson, UpdateLessonRequest},
        result::{AdminResultEntry, AdminResultParams},
        student::{StudentListItem, StudentListParams},
    },
    state::TagCache,
    utils::html::clean_html,
};

use super::lessons::{LESSON_SELECT, contains_pattern, fetch_lesson, set_lesson_tags};

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// Lists students with their result counts, newest first.
/// Admin only.
pub async fn list_students(
    State(pool): State<PgPool>,
    Query(params): Query<StudentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search_pattern = params.q.as_deref().map(contains_pattern);

    let students = sqlx::query_as::<_, StudentListItem>(
        r#"
        SELECT
            s.id, s.name, s.phone, s.approved, s.device_id, s.device_bound_at, s.xp,
            (SELECT COUNT(*) FROM results r WHERE r.student_id = s.id) AS result_count,
            s.created_at
        FROM students s
        WHERE ($1::BOOLEAN IS NULL OR s.approved = $1)
          AND ($2::TEXT IS NULL OR s.name ILIKE $2 OR s.phone ILIKE $2)
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(params.approved)
    .bind(search_pattern)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list students: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(students))
}

/// Approves a pending student.
/// Admin only.
pub async fn approve_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("UPDATE students SET approved = TRUE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!(student_id = id, "Student approved");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Clears the device binding so the next login binds a new device.
/// Admin only.
pub async fn reset_device(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query(
        "UPDATE students SET device_id = NULL, device_bound_at = NULL WHERE id = $1",
    )
    .bind(id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    tracing::info!(student_id = id, "Student device binding reset");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Deletes a student with all of their results, ratings and achievements.
/// Admin only.
pub async fn delete_student(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM students WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete student: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Student not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Lessons
// ---------------------------------------------------------------------------

/// Lists every lesson, drafts included, with full question banks.
/// Admin only.
pub async fn list_lessons(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let sql = format!("{} GROUP BY l.id ORDER BY l.created_at DESC", LESSON_SELECT);
    let lessons = sqlx::query_as::<_, Lesson>(&sql).fetch_all(&pool).await?;
    Ok(Json(lessons))
}

/// Admin only.
pub async fn get_lesson(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_lesson(&pool, id).await?))
}

/// Creates a lesson and links its tags.
/// Admin only.
pub async fn create_lesson(
    State(pool): State<PgPool>,
    State(tag_cache): State<TagCache>,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO lessons
            (title, description, video_url, questions, pool, total_points, time_limit_minutes, published)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.title.trim())
    .bind(clean_html(&payload.description))
    .bind(&payload.video_url)
    .bind(SqlJson(&payload.questions))
    .bind(SqlJson(&payload.pool))
    .bind(payload.total_points)
    .bind(payload.time_limit_minutes)
    .bind(payload.published)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create lesson: {:?}", e);
        AppError::from(e)
    })?;

    set_lesson_tags(&mut tx, id, &payload.tag_ids).await?;
    tx.commit().await?;
    // Tag lesson counts changed
    tag_cache.invalidate_all();

    tracing::info!(lesson_id = id, questions = payload.questions.len(), "Lesson created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "id": id })),
    ))
}

/// Updates the provided fields of a lesson.
/// Admin only.
pub async fn update_lesson(
    State(pool): State<PgPool>,
    State(tag_cache): State<TagCache>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut tx = pool.begin().await?;

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("UPDATE lessons SET updated_at = NOW()");

    if let Some(title) = payload.title {
        builder.push(", title = ").push_bind(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        builder.push(", description = ").push_bind(clean_html(&description));
    }
    if let Some(video_url) = payload.video_url {
        builder.push(", video_url = ").push_bind(video_url);
    }
    if let Some(questions) = payload.questions {
        builder.push(", questions = ").push_bind(SqlJson(questions));
    }
    if let Some(question_pool) = payload.pool {
        builder.push(", pool = ").push_bind(SqlJson(question_pool));
    }
    if let Some(total_points) = payload.total_points {
        builder.push(", total_points = ").push_bind(total_points);
    }
    if let Some(minutes) = payload.time_limit_minutes {
        builder.push(", time_limit_minutes = ").push_bind(minutes);
    }
    if let Some(published) = payload.published {
        builder.push(", published = ").push_bind(published);
    }

    builder.push(" WHERE id = ").push_bind(id);

    let result = builder.build().execute(&mut *tx).await.map_err(|e| {
        tracing::error!("Failed to update lesson: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    let retagged = match payload.tag_ids {
        Some(tag_ids) => {
            set_lesson_tags(&mut tx, id, &tag_ids).await?;
            true
        }
        None => false,
    };

    tx.commit().await?;
    if retagged {
        tag_cache.invalidate_all();
    }
    tracing::info!(lesson_id = id, "Lesson updated");

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Deletes a lesson; its results, ratings and tag links cascade.
/// Admin only.
pub async fn delete_lesson(
    State(pool): State<PgPool>,
    State(tag_cache): State<TagCache>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM lessons WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    tag_cache.invalidate_all();
    tracing::info!(lesson_id = id, "Lesson deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Lists results of all students, filterable by student and lesson.
/// Admin only.
pub async fn list_results(
    State(pool): State<PgPool>,
    Query(params): Query<AdminResultParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let results = sqlx::query_as::<_, AdminResultEntry>(
        r#"
        SELECT
            r.id, r.student_id, s.name AS student_name,
            r.lesson_id, l.title AS lesson_title,
            r.score, r.total_points, r.correct_count, r.question_count, r.created_at
        FROM results r
        JOIN students s ON s.id = r.student_id
        JOIN lessons l ON l.id = r.lesson_id
        WHERE ($1::BIGINT IS NULL OR r.student_id = $1)
          AND ($2::BIGINT IS NULL OR r.lesson_id = $2)
          AND ($3::TIMESTAMPTZ IS NULL OR r.created_at < $3)
        ORDER BY r.created_at DESC
        LIMIT $4
        "#,
    )
    .bind(params.student_id)
    .bind(params.lesson_id)
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(results))
}

/// Deletes a single result. XP already awarded is kept.
/// Admin only.
pub async fn delete_result(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM results WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Result not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
