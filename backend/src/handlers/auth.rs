// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::student::{
        Admin, AdminLoginRequest, LoginRequest, MeResponse, RegisterRequest, STUDENT_COLUMNS,
        Student,
    },
    services::gamification::level_for_xp,
    utils::{
        csrf::CSRF_COOKIE,
        device::is_valid_device_id,
        hash::{hash_password, verify_password},
        jwt::{AuthStudent, ROLE_ADMIN, ROLE_STUDENT, SESSION_COOKIE, sign_jwt},
    },
};

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .path("/")
        .build()
}

/// Registers a new student.
///
/// The account starts unapproved; an admin must approve it before login.
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let sql = format!(
        "INSERT INTO students (name, phone, password) VALUES ($1, $2, $3) RETURNING {}",
        STUDENT_COLUMNS
    );
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(payload.name.trim())
        .bind(&payload.phone)
        .bind(hashed_password)
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("This phone number is already registered".to_string())
            } else {
                tracing::error!("Failed to register student: {:?}", e);
                AppError::from(e)
            }
        })?;

    tracing::info!(student_id = student.id, "Student registered, awaiting approval");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration received. Your account is pending approval.",
            "student": student,
        })),
    ))
}

/// Authenticates a student and binds the account to the submitted device.
///
/// * Unapproved accounts get 403.
/// * The first login binds `device_id`; later logins from another device get
///   403 until an admin resets the binding.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if !is_valid_device_id(&payload.device_id) {
        return Err(AppError::BadRequest("Invalid device identifier".to_string()));
    }

    let sql = format!("SELECT {} FROM students WHERE phone = $1", STUDENT_COLUMNS);
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(&payload.phone)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid phone or password".to_string()))?;

    if !verify_password(&payload.password, &student.password)? {
        return Err(AppError::AuthError("Invalid phone or password".to_string()));
    }

    if !student.approved {
        return Err(AppError::Forbidden(
            "Your account is pending approval".to_string(),
        ));
    }

    // Bind atomically; concurrent first logins from two devices cannot both win.
    let (bound_device,): (Option<String>,) = sqlx::query_as(
        r#"
        UPDATE students
        SET device_id = COALESCE(device_id, $1),
            device_bound_at = COALESCE(device_bound_at, NOW())
        WHERE id = $2
        RETURNING device_id
        "#,
    )
    .bind(&payload.device_id)
    .bind(student.id)
    .fetch_one(&pool)
    .await?;

    if bound_device.as_deref() != Some(payload.device_id.as_str()) {
        tracing::warn!(student_id = student.id, "Login from an unbound device rejected");
        return Err(AppError::Forbidden(
            "This account is linked to another device. Contact your teacher to reset it."
                .to_string(),
        ));
    }

    let token = sign_jwt(
        student.id,
        &student.name,
        ROLE_STUDENT,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!(student_id = student.id, "Student logged in");

    Ok((
        jar.add(session_cookie(token.clone(), &config)),
        Json(json!({
            "success": true,
            "token": token,
            "type": "Bearer",
            "student": student,
        })),
    ))
}

/// Authenticates an admin.
pub async fn admin_login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    jar: CookieJar,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let admin = sqlx::query_as::<_, Admin>(
        "SELECT id, username, password FROM admins WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &admin.password)? {
        return Err(AppError::AuthError("Invalid username or password".to_string()));
    }

    let token = sign_jwt(
        admin.id,
        &admin.username,
        ROLE_ADMIN,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!(admin = %admin.username, "Admin logged in");

    Ok((
        jar.add(session_cookie(token.clone(), &config)),
        Json(json!({
            "success": true,
            "token": token,
            "type": "Bearer",
        })),
    ))
}

/// Clears the session and CSRF cookies.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/"))
        .remove(Cookie::build(CSRF_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}

/// Profile of the logged-in student.
pub async fn me(
    State(pool): State<PgPool>,
    student: AuthStudent,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(student.id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Student not found".to_string()))?;

    Ok(Json(MeResponse {
        id: student.id,
        name: student.name,
        phone: student.phone,
        approved: student.approved,
        device_bound: student.device_id.is_some(),
        xp: student.xp,
        level: level_for_xp(student.xp),
        current_streak: student.current_streak,
        created_at: student.created_at,
    }))
}
