use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::identity::{Identity, IdentityError, IdentityProvider};
use crate::models::user::{UserProfile, USERS};
use crate::utils::cookies::{CookieSettings, SESSION_COOKIE};
use crate::utils::jwt::SessionKeys;
use crate::utils::validation::validate_payload;

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    email: String,
    #[validate(length(min = 6, max = 128, message = "must be between 6 and 128 characters"))]
    password: String,
    #[validate(length(min = 1, max = 64, message = "must be between 1 and 64 characters"))]
    display_name: String,
}

#[derive(Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email(message = "must be a valid email address"))]
    email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    id_token: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse {
    message: String,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    uid: String,
    email: String,
    name: String,
    issued_at: String,
    expires_at: String,
}

pub async fn register(
    store: web::Data<dyn DocumentStore>,
    identity: web::Data<dyn IdentityProvider>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&req.0)?;

    let account = identity
        .create_account(&req.email, &req.password, &req.display_name)
        .await
        .map_err(|err| match err {
            IdentityError::EmailExists => AppError::BadRequest("Email already exists".to_string()),
            other => AppError::upstream("Error registering user", other),
        })?;

    let profile = match create_profile(store.get_ref(), &account).await {
        Ok(profile) => profile,
        Err(err) => {
            // Without a profile the account could never log in nor register again.
            if let Err(rollback) = identity.delete_account(&account).await {
                log::error!("Failed to remove account {} without profile: {}", account.uid, rollback);
            }
            return Err(err);
        }
    };

    log::info!("Registered user {}", profile.id);
    Ok(HttpResponse::Created().json(profile))
}

async fn create_profile(store: &dyn DocumentStore, account: &Identity) -> Result<UserProfile, AppError> {
    let document = store
        .create(
            USERS,
            &account.uid,
            json!({
                "id": account.uid,
                "email": account.email,
                "displayName": account.display_name,
            }),
        )
        .await
        .map_err(|err| AppError::upstream("Error registering user", err))?
        .ok_or_else(|| AppError::upstream("Error registering user", "profile already exists for new uid"))?;

    UserProfile::from_document(document).map_err(|err| AppError::upstream("Error registering user", err))
}

/// Provider-side credential exchange: email and password in, identity token out.
pub async fn sign_in(
    identity: web::Data<dyn IdentityProvider>,
    req: web::Json<SignInRequest>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&req.0)?;

    let id_token = identity
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|err| match err {
            IdentityError::InvalidCredentials => AppError::Unauthorized("Invalid email or password".to_string()),
            other => AppError::upstream("Error signing in", other),
        })?;

    Ok(HttpResponse::Ok().json(SignInResponse { id_token }))
}

pub async fn login(
    store: web::Data<dyn DocumentStore>,
    identity: web::Data<dyn IdentityProvider>,
    keys: web::Data<SessionKeys>,
    cookies: web::Data<CookieSettings>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let id_token = req
        .into_inner()
        .id_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("ID token is required".to_string()))?;

    let verified = identity
        .verify_id_token(&id_token)
        .await
        .map_err(|err| match err {
            IdentityError::InvalidToken(reason) => {
                log::warn!("Rejected identity token: {}", reason);
                AppError::Unauthorized("Invalid ID token".to_string())
            }
            other => AppError::upstream("Error logging in", other),
        })?;

    let profile = store
        .get(USERS, &verified.uid)
        .await
        .map_err(|err| AppError::upstream("Error logging in", err))?
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))?;
    let profile = UserProfile::from_document(profile)
        .map_err(|err| AppError::upstream("Error logging in", err))?;

    let token = keys
        .generate_token(&profile)
        .map_err(|err| AppError::upstream("Error logging in", err))?;

    log::info!("Issued session for user {}", profile.id);
    Ok(HttpResponse::Ok()
        .cookie(cookies.session(token.clone()))
        .json(LoginResponse {
            message: "Login successful".to_string(),
            token,
        }))
}

pub async fn logout(cookies: web::Data<CookieSettings>) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(cookies.cleared_session())
        .json(json!({ "message": "Logged out successfully" }))
}

pub async fn current_session(req: HttpRequest, keys: web::Data<SessionKeys>) -> Result<HttpResponse, AppError> {
    let token = req
        .cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

    let claims = keys
        .validate_token(&token)
        .map_err(|err| AppError::Unauthorized(format!("Invalid session: {}", err)))?;

    let rfc3339 = |seconds: usize| {
        Utc.timestamp_opt(seconds as i64, 0)
            .single()
            .map(|at| at.to_rfc3339())
            .unwrap_or_default()
    };

    Ok(HttpResponse::Ok().json(SessionResponse {
        uid: claims.sub,
        email: claims.email,
        name: claims.name,
        issued_at: rfc3339(claims.iat),
        expires_at: rfc3339(claims.exp),
    }))
}
