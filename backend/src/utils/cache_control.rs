// src/utils/cache_control.rs

use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware::Next,
    response::Response,
};

pub const PUBLIC_MAX_AGE: &str = "public, max-age=60, stale-while-revalidate=300";
pub const NO_STORE: &str = "no-store";

/// Axum Middleware: short shared caching for successful public GETs.
pub async fn public_cache(req: Request<Body>, next: Next) -> Response {
    let cacheable = req.method() == Method::GET;
    let mut response = next.run(req).await;

    let value = if cacheable && response.status().is_success() {
        PUBLIC_MAX_AGE
    } else {
        NO_STORE
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    response
}

/// Axum Middleware: personalised and admin responses are never cached.
pub async fn no_store(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    response
}
