// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{HeaderMap, Request, header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{config::Config, error::AppError};

pub const SESSION_COOKIE: &str = "session";
pub const ROLE_STUDENT: &str = "student";
pub const ROLE_ADMIN: &str = "admin";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the student or admin ID (as string).
    pub sub: String,
    /// 'student' or 'admin'.
    pub role: String,
    /// Display name.
    pub name: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }
}

/// Claims of an attempt token: which questions were served and their points.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AttemptClaims {
    pub sub: String,
    /// Unique per started attempt; a result row is stored once per id.
    pub attempt_id: String,
    pub lesson_id: i64,
    /// Served question ids paired with their point values, in served order.
    pub questions: Vec<(String, f64)>,
    pub exp: usize,
}

pub fn expires_at(ttl_seconds: u64) -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + ttl_seconds as usize)
}

/// Signs any claims set with HS256.
pub fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies signature and expiry and decodes the claims.
pub fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, AppError> {
    let token_data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Signs a new session token.
pub fn sign_jwt(
    id: i64,
    name: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        name: name.to_owned(),
        exp: expires_at(expiration_seconds)?,
    };
    sign(&claims, secret)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify::<Claims>(token, secret)
}

/// Bearer header first, then the session cookie.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE).map(|cookie| cookie.value().to_owned())
        })
}

/// Axum Middleware: Authentication.
///
/// Validates the bearer token or session cookie and injects `Claims` into the
/// request extensions. Returns 401 otherwise.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

    let claims = verify_jwt(&token, &config.jwt_secret)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

    if claims.role != ROLE_ADMIN {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(req).await)
}

/// Extractor for the logged-in student. Requires `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthStudent {
    pub id: i64,
    pub name: String,
}

impl<S> FromRequestParts<S> for AuthStudent
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

        if claims.role != ROLE_STUDENT {
            return Err(AppError::Forbidden("Student account required".to_string()));
        }

        Ok(AuthStudent {
            id: claims.user_id()?,
            name: claims.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "jwt-test-secret";

    #[test]
    fn session_token_round_trips_claims() {
        let token = sign_jwt(42, "Ada", ROLE_STUDENT, SECRET, 60).unwrap();
        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.role, ROLE_STUDENT);
        assert_eq!(claims.name, "Ada");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_jwt(1, "Ada", ROLE_STUDENT, SECRET, 60).unwrap();
        assert!(matches!(verify_jwt(&token, "nope"), Err(AppError::AuthError(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = Claims {
            sub: "1".to_string(),
            role: ROLE_STUDENT.to_string(),
            name: "Ada".to_string(),
            exp: 1_000,
        };
        let token = sign(&claims, SECRET).unwrap();
        assert!(verify_jwt(&token, SECRET).is_err());
    }

    #[test]
    fn token_is_read_from_cookie_when_no_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "session=abc.def.ghi".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert(header::AUTHORIZATION, "Bearer xyz".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("xyz"));
    }
}
