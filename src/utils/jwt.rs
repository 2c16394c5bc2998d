use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::UserProfile;

/// Sessions are short-lived and cannot be refreshed; expiry is the only revocation.
pub const SESSION_TTL_SECONDS: i64 = 120;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: String, // User uid
    pub email: String,
    pub name: String,
    pub iat: usize,
    pub exp: usize, // Expiration timestamp
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate_token(&self, profile: &UserProfile) -> Result<String, jsonwebtoken::errors::Error> {
        self.generate_token_at(profile, Utc::now())
    }

    pub fn generate_token_at(
        &self,
        profile: &UserProfile,
        issued_at: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: profile.id.clone(),
            email: profile.email.clone(),
            name: profile.display_name.clone(),
            iat: issued_at.timestamp() as usize,
            exp: (issued_at + Duration::seconds(SESSION_TTL_SECONDS)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}
