// src/handlers/tags.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::tag::{CreateTagRequest, Tag},
    state::{TAG_CACHE_KEY, TagCache},
};

/// Lists tags with their lesson counts. Memoized for `TAG_CACHE_TTL_SECS`.
pub async fn list_tags(
    State(pool): State<PgPool>,
    State(cache): State<TagCache>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(tags) = cache.get(TAG_CACHE_KEY).await {
        return Ok(Json(tags.as_ref().clone()));
    }

    let tags = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, COUNT(lt.lesson_id) AS lesson_count
        FROM tags t
        LEFT JOIN lesson_tags lt ON lt.tag_id = t.id
        GROUP BY t.id
        ORDER BY t.name
        "#,
    )
    .fetch_all(&pool)
    .await?;

    cache.insert(TAG_CACHE_KEY, Arc::new(tags.clone())).await;
    Ok(Json(tags))
}

/// Creates a tag.
/// Admin only.
pub async fn create_tag(
    State(pool): State<PgPool>,
    State(cache): State<TagCache>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let name = payload.name.trim();

    let id: i64 = sqlx::query_scalar("INSERT INTO tags (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Tag '{}' already exists", name))
            } else {
                AppError::from(e)
            }
        })?;

    cache.invalidate_all();

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "id": id })),
    ))
}

/// Deletes a tag and its lesson links.
/// Admin only.
pub async fn delete_tag(
    State(pool): State<PgPool>,
    State(cache): State<TagCache>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tag not found".to_string()));
    }

    cache.invalidate_all();
    Ok(StatusCode::NO_CONTENT)
}
