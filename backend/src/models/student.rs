// src/models/student.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'students' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,

    pub name: String,

    /// Unique login identifier.
    pub phone: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Set by an admin; unapproved students cannot log in.
    pub approved: bool,

    /// Device the account is bound to, set on first login.
    pub device_id: Option<String>,
    pub device_bound_at: Option<chrono::DateTime<chrono::Utc>>,

    pub xp: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<chrono::NaiveDate>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Columns selected whenever a full `Student` row is loaded.
pub const STUDENT_COLUMNS: &str = "id, name, phone, password, approved, device_id, device_bound_at, \
     xp, current_streak, longest_streak, last_activity_date, created_at";

/// DTO for student registration.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 2,
        max = 100,
        message = "Name length must be between 2 and 100 characters."
    ))]
    pub name: String,
    #[validate(regex(
        path = *PHONE_RE,
        message = "Phone must contain 8 to 15 digits, optionally starting with +."
    ))]
    pub phone: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
}

static PHONE_RE: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^\+?[0-9]{8,15}$").expect("valid phone regex"));

/// DTO for student login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    /// Hashed fingerprint produced by the client (or `/api/device/identify`).
    pub device_id: String,
}

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Profile of the logged-in student.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub approved: bool,
    pub device_bound: bool,
    pub xp: i64,
    pub level: i64,
    pub current_streak: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Row shown in the admin student list.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentListItem {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub approved: bool,
    pub device_id: Option<String>,
    pub device_bound_at: Option<chrono::DateTime<chrono::Utc>>,
    pub xp: i64,
    pub result_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for the admin student list.
#[derive(Debug, Deserialize)]
pub struct StudentListParams {
    pub approved: Option<bool>,
    /// Name or phone search keyword.
    pub q: Option<String>,
}

/// Represents the 'admins' table.
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(phone: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            phone: phone.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[test]
    fn phone_format_is_checked() {
        assert!(register("+201001234567").validate().is_ok());
        assert!(register("01001234567").validate().is_ok());
        assert!(register("12-34").validate().is_err());
        assert!(register("phone").validate().is_err());
    }
}
