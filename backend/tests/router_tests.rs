// tests/router_tests.rs
//
// Drives the router in-process. None of these paths need a live database.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;

use common::{admin_token, body_json, json_request, offline_router, student_token};

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn device_traits() -> serde_json::Value {
    json!({
        "screen_width": 1366,
        "screen_height": 768,
        "color_depth": 24,
        "pixel_ratio": 1.0,
        "timezone": "Africa/Cairo",
        "platform": "Win32",
        "language": "ar-EG",
        "hardware_concurrency": 4,
        "webgl_renderer": "ANGLE (Intel HD Graphics)"
    })
}

#[tokio::test]
async fn health_is_ok_and_not_cached() {
    let response = offline_router().oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let response = offline_router()
        .oneshot(get("/random_path_that_does_not_exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csrf_token_endpoint_sets_readable_cookie() {
    let response = offline_router().oneshot(get("/api/csrf-token")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("csrf_token="));
    assert!(!cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    let token = body["csrfToken"].as_str().unwrap();
    assert!(cookie.contains(token));
}

#[tokio::test]
async fn post_without_csrf_token_is_forbidden() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/device/identify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(device_traits().to_string()))
        .unwrap();

    let response = offline_router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid CSRF token");
}

#[tokio::test]
async fn csrf_applies_to_login_too() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-csrf-token", "forged.token")
        .header(header::COOKIE, "csrf_token=forged.token")
        .body(Body::from(
            json!({"phone": "01001234567", "password": "x", "device_id": "fb-00000000"})
                .to_string(),
        ))
        .unwrap();

    let response = offline_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn device_identify_is_deterministic() {
    let first = offline_router()
        .oneshot(json_request("POST", "/api/device/identify", device_traits()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;

    let second = offline_router()
        .oneshot(json_request("POST", "/api/device/identify", device_traits()))
        .await
        .unwrap();
    let second = body_json(second).await;

    let id = first["deviceId"].as_str().unwrap();
    assert_eq!(id.len(), 64);
    assert_eq!(first["deviceId"], second["deviceId"]);

    let mut other = device_traits();
    other["screen_width"] = json!(1920);
    let third = offline_router()
        .oneshot(json_request("POST", "/api/device/identify", other))
        .await
        .unwrap();
    assert_ne!(body_json(third).await["deviceId"], first["deviceId"]);
}

#[tokio::test]
async fn student_routes_require_authentication() {
    for uri in ["/api/auth/me", "/api/history", "/api/quiz/1", "/api/gamification/profile"] {
        let response = offline_router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let response = offline_router()
        .oneshot(get_with_token("/api/auth/me", "not.a.jwt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn students_cannot_reach_admin_routes() {
    let response = offline_router()
        .oneshot(get_with_token("/api/admin/students", &student_token(7)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admins_cannot_use_student_routes() {
    let response = offline_router()
        .oneshot(get_with_token("/api/auth/me", &admin_token()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_sees_ai_cache_stats() {
    let response = offline_router()
        .oneshot(get_with_token("/api/admin/ai/cache-stats", &admin_token()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let body = body_json(response).await;
    assert_eq!(body["hits"], 0);
    assert_eq!(body["misses"], 0);
}

#[tokio::test]
async fn ai_format_turns_text_into_questions_and_caches() {
    let app = offline_router();
    let request = |token: &str| {
        let mut request = json_request(
            "POST",
            "/api/admin/ai/format",
            json!({"text": "1) SI unit of force? 2) Sound in vacuum?", "mode": "questions"}),
        );
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        request
    };

    let token = admin_token();
    let first = app.clone().oneshot(request(&token)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["cached"], false);
    assert_eq!(first["questions"].as_array().unwrap().len(), 2);
    assert_eq!(first["questions"][1]["options"], json!(["True", "False"]));

    let second = body_json(app.clone().oneshot(request(&token)).await.unwrap()).await;
    assert_eq!(second["cached"], true);

    let stats = body_json(
        app.oneshot(get_with_token("/api/admin/ai/cache-stats", &token))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
}

#[tokio::test]
async fn blank_ai_text_is_rejected() {
    let mut request = json_request("POST", "/api/admin/ai/format", json!({"text": "   "}));
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", admin_token()).parse().unwrap(),
    );

    let response = offline_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn upload_request(file_len: usize) -> Request<Body> {
    let boundary = "physics-upload-boundary";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\n",
        b = boundary
    )
    .into_bytes();
    body.extend(std::iter::repeat_n(b'a', file_len));
    body.extend(format!("\r\n--{}--\r\n", boundary).into_bytes());

    let csrf = common::csrf_token();
    Request::builder()
        .method("POST")
        .uri("/api/admin/ai/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", admin_token()))
        .header("x-csrf-token", &csrf)
        .header(header::COOKIE, format!("csrf_token={}", csrf))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn file_over_upload_limit_is_413_json() {
    // Test config allows 1 MiB files.
    let response = offline_router()
        .oneshot(upload_request(1024 * 1024 + 1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn body_over_request_limit_is_413_json() {
    let response = offline_router()
        .oneshot(upload_request(3 * 1024 * 1024))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}
