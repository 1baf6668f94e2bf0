// src/handlers/gallery.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::gallery::{CreateGalleryItemRequest, GalleryItem, UpdateGalleryItemRequest},
    utils::html::clean_optional,
};

pub async fn list_gallery(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let items = sqlx::query_as::<_, GalleryItem>(
        "SELECT id, title, image_url, description, created_at FROM gallery_items ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(items))
}

/// Creates a gallery item.
/// Admin only.
pub async fn create_gallery_item(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateGalleryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let item = sqlx::query_as::<_, GalleryItem>(
        r#"
        INSERT INTO gallery_items (title, image_url, description)
        VALUES ($1, $2, $3)
        RETURNING id, title, image_url, description, created_at
        "#,
    )
    .bind(payload.title.trim())
    .bind(&payload.image_url)
    .bind(clean_optional(payload.description))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create gallery item: {:?}", e);
        AppError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Updates a gallery item by ID.
/// Admin only.
pub async fn update_gallery_item(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateGalleryItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.title.is_none() && payload.image_url.is_none() && payload.description.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE gallery_items SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title.trim().to_string());
    }

    if let Some(image_url) = payload.image_url {
        separated.push("image_url = ");
        separated.push_bind_unseparated(image_url);
    }

    if payload.description.is_some() {
        separated.push("description = ");
        separated.push_bind_unseparated(clean_optional(payload.description));
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update gallery item: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Gallery item not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a gallery item by ID.
/// Admin only.
pub async fn delete_gallery_item(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM gallery_items WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Gallery item not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
