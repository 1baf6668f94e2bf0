// src/models/rating.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RateLessonRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5."))]
    pub rating: i16,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

/// Average rating of a lesson.
#[derive(Debug, Serialize, FromRow)]
pub struct RatingSummary {
    pub lesson_id: i64,
    pub average: f64,
    pub count: i64,
}
