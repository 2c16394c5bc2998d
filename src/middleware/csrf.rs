use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::Method;
use actix_web::middleware::Next;

use crate::errors::AppError;
use crate::utils::cookies::CSRF_COOKIE;

pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// Double-submit check: unsafe methods must echo the `csrf_token` cookie in
/// the `X-CSRF-Token` header. Runs before any handler.
pub async fn verify_csrf(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if is_safe(req.method()) {
        return next.call(req).await;
    }

    let header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let cookie = req
        .request()
        .cookie(CSRF_COOKIE)
        .map(|cookie| cookie.value().to_string());

    match (header, cookie) {
        (Some(header), Some(cookie)) if !cookie.is_empty() && tokens_match(&header, &cookie) => {
            next.call(req).await
        }
        _ => {
            log::warn!("Rejected {} {}: invalid CSRF token", req.method(), req.path());
            Err(AppError::Forbidden("Invalid CSRF token".to_string()).into())
        }
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn tokens_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
