use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};

use crate::utils::jwt::SESSION_TTL_SECONDS;

pub const SESSION_COOKIE: &str = "session";
pub const CSRF_COOKIE: &str = "csrf_token";

/// `secure` is only turned off for plain-http local development.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    pub fn session(&self, token: String) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(Duration::seconds(SESSION_TTL_SECONDS))
            .finish()
    }

    pub fn cleared_session(&self) -> Cookie<'static> {
        let mut cookie = self.session(String::new());
        cookie.make_removal();
        cookie
    }

    pub fn csrf(&self, token: String) -> Cookie<'static> {
        Cookie::build(CSRF_COOKIE, token)
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .finish()
    }
}
