// src/handlers/ai.rs

use std::{sync::Arc, time::Instant};

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::ai::{AiInteraction, FormatMode, FormatResponse, FormatTextRequest},
    services::{
        ai::{AiService, Formatted},
        document::{self, DocumentContent},
    },
};

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file is too large".to_string())
    } else {
        AppError::BadRequest(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Writes one `ai_interactions` row. Failures are logged, never surfaced.
async fn log_interaction(
    pool: &PgPool,
    mode: FormatMode,
    input_chars: usize,
    outcome: &Result<Formatted, AppError>,
    started: Instant,
) {
    let (output_chars, cached, error) = match outcome {
        Ok(formatted) => (formatted.text.chars().count(), formatted.cached, None),
        Err(e) => (0, false, Some(e.to_string())),
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO ai_interactions
            (mode, input_chars, output_chars, cached, success, error, duration_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(mode.as_str())
    .bind(input_chars.min(i32::MAX as usize) as i32)
    .bind(output_chars.min(i32::MAX as usize) as i32)
    .bind(cached)
    .bind(outcome.is_ok())
    .bind(error)
    .bind(started.elapsed().as_millis().min(i64::MAX as u128) as i64)
    .execute(pool)
    .await;

    if let Err(e) = inserted {
        tracing::warn!("Failed to record AI interaction: {:?}", e);
    }
}

async fn run_format(
    pool: &PgPool,
    ai: &AiService,
    mode: FormatMode,
    content: DocumentContent,
) -> Result<FormatResponse, AppError> {
    let input_chars = match &content {
        DocumentContent::Text(text) => text.chars().count(),
        DocumentContent::Pdf(bytes) => bytes.len(),
    };

    let started = Instant::now();
    let outcome = ai.format(mode, &content).await;
    log_interaction(pool, mode, input_chars, &outcome, started).await;

    let formatted = outcome.inspect_err(|e| {
        tracing::warn!(mode = mode.as_str(), "AI formatting failed: {}", e);
    })?;

    tracing::info!(
        mode = mode.as_str(),
        cached = formatted.cached,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "AI formatting finished"
    );

    Ok(FormatResponse {
        success: true,
        mode,
        text: formatted.text,
        questions: formatted.questions,
        cached: formatted.cached,
    })
}

/// Formats pasted text.
/// Admin only.
pub async fn format_text(
    State(pool): State<PgPool>,
    State(ai): State<Arc<AiService>>,
    Json(payload): Json<FormatTextRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let text = payload.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("Text must not be blank".to_string()));
    }

    let response = run_format(&pool, &ai, payload.mode, DocumentContent::Text(text)).await?;
    Ok(Json(response))
}

/// Formats an uploaded PDF, DOCX or TXT document.
///
/// Multipart fields:
/// * `file` (required)
/// * `mode` (optional, `questions` or `cleanup`)
///
/// Admin only.
pub async fn upload_document(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    State(ai): State<Arc<AiService>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut mode = FormatMode::default();
    let mut document: Option<DocumentContent> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(ToOwned::to_owned);
        match name.as_deref() {
            Some("mode") => {
                let value = field.text().await.map_err(multipart_error)?;
                mode = serde_json::from_value(serde_json::Value::String(value.trim().to_string()))
                    .map_err(|_| AppError::BadRequest(format!("Unknown mode '{}'", value)))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(ToOwned::to_owned);
                let bytes = field.bytes().await.map_err(multipart_error)?;

                if bytes.len() > config.max_upload_bytes {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File exceeds the {} byte limit",
                        config.max_upload_bytes
                    )));
                }

                tracing::debug!(filename = %filename, size = bytes.len(), "Received upload");
                document = Some(document::extract(
                    &filename,
                    content_type.as_deref(),
                    bytes.to_vec(),
                )?);
            }
            _ => {}
        }
    }

    let content =
        document.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    let response = run_format(&pool, &ai, mode, content).await?;
    Ok(Json(response))
}

/// Admin only.
pub async fn cache_stats(State(ai): State<Arc<AiService>>) -> impl IntoResponse {
    Json(ai.stats().await)
}

/// Drops every cached AI response and resets the counters.
/// Admin only.
pub async fn clear_cache(State(ai): State<Arc<AiService>>) -> impl IntoResponse {
    ai.clear().await;
    tracing::info!("AI cache cleared");
    Json(serde_json::json!({ "success": true }))
}

/// Most recent formatter calls, newest first.
/// Admin only.
pub async fn list_interactions(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let interactions = sqlx::query_as::<_, AiInteraction>(
        r#"
        SELECT id, mode, input_chars, output_chars, cached, success, error, duration_ms, created_at
        FROM ai_interactions
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(interactions))
}
