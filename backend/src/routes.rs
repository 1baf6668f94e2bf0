// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{
        admin, ai, auth, device, gallery, gamification, health, history, lessons, quiz, ratings,
        tags,
    },
    state::AppState,
    utils::{
        cache_control::{no_store, public_cache},
        csrf::{CSRF_HEADER, csrf_middleware, get_csrf_token},
        jwt::{admin_middleware, auth_middleware},
    },
};

/// Slack on top of the file limit for multipart boundaries and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ])
}

/// Assembles the main application router.
///
/// * Public reads get short shared caching; personalised and admin routes are
///   `no-store`.
/// * Student routes sit behind `auth_middleware`, admin routes behind
///   `auth_middleware` then `admin_middleware`.
/// * CSRF validation wraps every `/api` route; CORS and tracing wrap the whole app.
pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let open_routes = Router::new()
        .route("/health", get(health::health))
        .route("/csrf-token", get(get_csrf_token))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/admin/login", post(auth::admin_login))
        .route("/auth/logout", post(auth::logout))
        .route("/device/identify", post(device::identify))
        .layer(middleware::from_fn(no_store));

    let public_routes = Router::new()
        .route("/lessons", get(lessons::list_lessons))
        .route("/lessons/{id}", get(lessons::get_lesson))
        .route("/lessons/{id}/ratings", get(ratings::get_ratings))
        .route("/gamification/leaderboard", get(gamification::get_leaderboard))
        .route("/tags", get(tags::list_tags))
        .route("/gallery", get(gallery::list_gallery))
        .layer(middleware::from_fn(public_cache));

    let student_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/lessons/{id}/ratings", post(ratings::rate_lesson))
        .route("/quiz/{lesson_id}", get(quiz::start_quiz))
        .route("/quiz/{lesson_id}/submit", post(quiz::submit_quiz))
        .route("/history", get(history::list_history))
        .route("/history/stats", get(history::history_stats))
        .route("/history/{id}", get(history::get_result))
        .route("/gamification/profile", get(gamification::get_profile))
        .layer(middleware::from_fn(no_store))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/students", get(admin::list_students))
        .route("/students/{id}", delete(admin::delete_student))
        .route("/students/{id}/approve", put(admin::approve_student))
        .route("/students/{id}/reset-device", put(admin::reset_device))
        .route(
            "/lessons",
            get(admin::list_lessons).post(admin::create_lesson),
        )
        .route(
            "/lessons/{id}",
            get(admin::get_lesson)
                .put(admin::update_lesson)
                .delete(admin::delete_lesson),
        )
        .route("/results", get(admin::list_results))
        .route("/results/{id}", delete(admin::delete_result))
        .route("/tags", post(tags::create_tag))
        .route("/tags/{id}", delete(tags::delete_tag))
        .route("/gallery", post(gallery::create_gallery_item))
        .route(
            "/gallery/{id}",
            put(gallery::update_gallery_item).delete(gallery::delete_gallery_item),
        )
        .route("/ai/format", post(ai::format_text))
        .route(
            "/ai/upload",
            post(ai::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/ai/cache-stats", get(ai::cache_stats))
        .route("/ai/cache", delete(ai::clear_cache))
        .route("/ai/interactions", get(ai::list_interactions))
        .layer(middleware::from_fn(no_store))
        // Auth first, then the admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api_routes = Router::new()
        .merge(open_routes)
        .merge(public_routes)
        .merge(student_routes)
        .nest("/admin", admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware));

    Router::new()
        .nest("/api", api_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}
