// src/handlers/lessons.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::AppError,
    models::lesson::{Lesson, LessonListParams, LessonSummary},
};

/// Full lesson row with its tag names; callers append WHERE and GROUP BY.
pub(crate) const LESSON_SELECT: &str = r#"
    SELECT
        l.id, l.title, l.description, l.video_url, l.questions, l.pool,
        l.total_points, l.time_limit_minutes, l.published,
        COALESCE(ARRAY_AGG(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL), '{}') AS tags,
        l.created_at, l.updated_at
    FROM lessons l
    LEFT JOIN lesson_tags lt ON lt.lesson_id = l.id
    LEFT JOIN tags t ON t.id = lt.tag_id
"#;

const SUMMARY_SELECT: &str = r#"
    SELECT
        l.id, l.title, l.description, l.video_url, l.total_points, l.time_limit_minutes,
        jsonb_array_length(l.questions)::INT AS question_count,
        COALESCE(ARRAY_AGG(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL), '{}') AS tags,
        l.created_at
    FROM lessons l
    LEFT JOIN lesson_tags lt ON lt.lesson_id = l.id
    LEFT JOIN tags t ON t.id = lt.tag_id
"#;

/// Loads a lesson with its full question bank.
pub(crate) async fn fetch_lesson(pool: &PgPool, id: i64) -> Result<Lesson, AppError> {
    let sql = format!("{} WHERE l.id = $1 GROUP BY l.id", LESSON_SELECT);
    sqlx::query_as::<_, Lesson>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))
}

/// Replaces the tag links of a lesson.
pub(crate) async fn set_lesson_tags(
    tx: &mut Transaction<'_, Postgres>,
    lesson_id: i64,
    tag_ids: &[i64],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM lesson_tags WHERE lesson_id = $1")
        .bind(lesson_id)
        .execute(&mut **tx)
        .await?;

    if tag_ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO lesson_tags (lesson_id, tag_id) ");
    builder.push_values(tag_ids, |mut row, tag_id| {
        row.push_bind(lesson_id).push_bind(*tag_id);
    });
    builder.push(" ON CONFLICT DO NOTHING");

    builder.build().execute(&mut **tx).await.map_err(|e| {
        // 23503: foreign key violation
        if e.as_database_error().and_then(|db| db.code()).as_deref() == Some("23503") {
            AppError::BadRequest("Unknown tag id".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    Ok(())
}

/// `%keyword%` for `ILIKE`, with the keyword's own wildcards escaped.
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Lists published lessons, optionally filtered by tag name and title keyword.
pub async fn list_lessons(
    State(pool): State<PgPool>,
    Query(params): Query<LessonListParams>,
) -> Result<impl IntoResponse, AppError> {
    let search_pattern = params.q.as_deref().map(contains_pattern);

    let sql = format!(
        r#"{}
        WHERE l.published = TRUE
          AND ($1::TEXT IS NULL OR l.title ILIKE $1)
          AND ($2::TEXT IS NULL OR EXISTS (
                SELECT 1 FROM lesson_tags flt JOIN tags ft ON ft.id = flt.tag_id
                WHERE flt.lesson_id = l.id AND ft.name = $2))
        GROUP BY l.id
        ORDER BY l.created_at DESC
        "#,
        SUMMARY_SELECT
    );

    let lessons = sqlx::query_as::<_, LessonSummary>(&sql)
        .bind(search_pattern)
        .bind(params.tag)
        .fetch_all(&pool)
        .await?;

    Ok(Json(lessons))
}

/// Retrieves a single published lesson (without its question bank).
pub async fn get_lesson(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "{} WHERE l.id = $1 AND l.published = TRUE GROUP BY l.id",
        SUMMARY_SELECT
    );
    let lesson = sqlx::query_as::<_, LessonSummary>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    Ok(Json(lesson))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_keywords_match_literally() {
        assert_eq!(contains_pattern(" Ohm "), "%Ohm%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }
}
