use actix_web::{web, HttpResponse};
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;

use crate::utils::cookies::CookieSettings;

const TOKEN_LENGTH: usize = 43;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Issues a fresh token in both the response body and the `csrf_token` cookie.
pub async fn csrf_token(cookies: web::Data<CookieSettings>) -> HttpResponse {
    let token = generate_token();
    HttpResponse::Ok()
        .cookie(cookies.csrf(token.clone()))
        .json(CsrfTokenResponse { csrf_token: token })
}
