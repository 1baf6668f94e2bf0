// src/models/gallery.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'gallery_items' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: i64,
    pub title: String,
    pub image_url: String,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGalleryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 500), custom(function = validate_image_url))]
    pub image_url: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// DTO for updating a gallery item. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGalleryItemRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500), custom(function = validate_image_url))]
    pub image_url: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

/// Only absolute http(s) URLs are accepted as image sources.
fn validate_image_url(url: &str) -> Result<(), validator::ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_url")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_image_urls() {
        let item = CreateGalleryItemRequest {
            title: "Double slit".to_string(),
            image_url: "javascript:alert(1)".to_string(),
            description: None,
        };
        assert!(item.validate().is_err());

        let item = CreateGalleryItemRequest {
            image_url: "https://cdn.example.com/slit.png".to_string(),
            ..item
        };
        assert!(item.validate().is_ok());
    }
}
