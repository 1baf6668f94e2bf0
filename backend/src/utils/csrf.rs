// src/utils/csrf.rs

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde_json::json;
use sha2::Sha256;

use crate::{config::Config, error::AppError};

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

type HmacSha256 = Hmac<Sha256>;

fn sign(nonce: &str, secret: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    mac.update(nonce.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Issues a token of the form `nonce.hmac(nonce)`.
pub fn issue_token(secret: &str) -> Result<String, AppError> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let nonce = hex::encode(bytes);
    let signature = sign(&nonce, secret)?;
    Ok(format!("{}.{}", nonce, signature))
}

/// Checks the signature part of a token.
pub fn verify_token(token: &str, secret: &str) -> bool {
    let Some((nonce, signature)) = token.split_once('.') else {
        return false;
    };
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(nonce.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// Compares the header and cookie values in constant time for equal-length inputs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Double-submit check: header present, equal to the cookie, and signed by us.
pub fn validate_request(headers: &HeaderMap, secret: &str) -> bool {
    let Some(header_token) = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let jar = CookieJar::from_headers(headers);
    let Some(cookie) = jar.get(CSRF_COOKIE) else {
        return false;
    };

    constant_time_eq(header_token.as_bytes(), cookie.value().as_bytes())
        && verify_token(header_token, secret)
}

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Axum Middleware: CSRF validation.
///
/// Safe methods pass through; POST/PUT/PATCH/DELETE without a valid token
/// get 403.
pub async fn csrf_middleware(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if is_state_changing(req.method()) && !validate_request(req.headers(), &config.jwt_secret) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "Rejected request with missing or invalid CSRF token"
        );
        return Err(AppError::Forbidden("Invalid CSRF token".to_string()));
    }

    Ok(next.run(req).await)
}

/// Issues a fresh token as a readable cookie and in the body.
pub async fn get_csrf_token(
    State(config): State<Config>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let token = issue_token(&config.jwt_secret)?;

    let cookie = Cookie::build((CSRF_COOKIE, token.clone()))
        .http_only(false)
        .same_site(SameSite::Strict)
        .secure(config.cookie_secure)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(json!({ "success": true, "csrfToken": token })),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header};

    use super::*;

    const SECRET: &str = "csrf-test-secret";

    fn headers_with(header_token: Option<&str>, cookie_token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = header_token {
            headers.insert(CSRF_HEADER, HeaderValue::from_str(token).unwrap());
        }
        if let Some(token) = cookie_token {
            headers.insert(
                header::COOKIE,
                HeaderValue::from_str(&format!("{}={}", CSRF_COOKIE, token)).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn issued_tokens_verify_and_differ() {
        let a = issue_token(SECRET).unwrap();
        let b = issue_token(SECRET).unwrap();
        assert_ne!(a, b);
        assert!(verify_token(&a, SECRET));
        assert!(!verify_token(&a, "other-secret"));
    }

    #[test]
    fn matching_header_and_cookie_pass() {
        let token = issue_token(SECRET).unwrap();
        assert!(validate_request(&headers_with(Some(&token), Some(&token)), SECRET));
    }

    #[test]
    fn missing_or_mismatched_tokens_fail() {
        let token = issue_token(SECRET).unwrap();
        let other = issue_token(SECRET).unwrap();
        assert!(!validate_request(&headers_with(None, Some(&token)), SECRET));
        assert!(!validate_request(&headers_with(Some(&token), None), SECRET));
        assert!(!validate_request(&headers_with(Some(&token), Some(&other)), SECRET));
    }

    #[test]
    fn byte_comparison_requires_equal_length() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
    }

    #[test]
    fn forged_token_fails_even_when_cookie_matches() {
        let forged = format!("{}.{}", "ab".repeat(32), "00".repeat(32));
        assert!(!validate_request(&headers_with(Some(&forged), Some(&forged)), SECRET));
    }

    #[test]
    fn only_mutating_methods_are_checked() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::OPTIONS));
    }
}
