use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::{Identity, IdentityError, IdentityProvider, IdentityResult};
use crate::db::DocumentStore;

const IDENTITIES: &str = "identities";
const ISSUER: &str = "employee-directory-identity";
const ID_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: String,
    name: String,
    iss: String,
    iat: usize,
    exp: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredIdentity {
    uid: String,
    email: String,
    display_name: String,
    password_hash: String,
}

/// Identity provider keeping accounts in the document store, keyed by
/// lowercased email. Passwords are stored as argon2 PHC strings.
pub struct LocalIdentityProvider {
    store: Arc<dyn DocumentStore>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl LocalIdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>, secret: &str) -> Self {
        Self {
            store,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    fn issue_id_token(&self, identity: &Identity) -> IdentityResult<String> {
        let now = Utc::now();
        let claims = IdTokenClaims {
            sub: identity.uid.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            iss: ISSUER.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::minutes(ID_TOKEN_TTL_MINUTES)).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| IdentityError::Backend(err.to_string()))
    }
}

fn hash_password(password: &str) -> IdentityResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| IdentityError::Backend(err.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> IdentityResult<()> {
    let parsed = PasswordHash::new(stored_hash).map_err(|err| IdentityError::Backend(err.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str, display_name: &str) -> IdentityResult<Identity> {
        let identity = Identity {
            uid: Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        let record = json!({
            "uid": identity.uid,
            "email": identity.email,
            "displayName": identity.display_name,
            "passwordHash": hash_password(password)?,
        });

        let created = self
            .store
            .create(IDENTITIES, &email.to_lowercase(), record)
            .await
            .map_err(|err| IdentityError::Backend(err.to_string()))?;

        match created {
            Some(_) => Ok(identity),
            None => Err(IdentityError::EmailExists),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<String> {
        let document = self
            .store
            .get(IDENTITIES, &email.to_lowercase())
            .await
            .map_err(|err| IdentityError::Backend(err.to_string()))?
            .ok_or(IdentityError::InvalidCredentials)?;

        let stored: StoredIdentity =
            serde_json::from_value(document.data).map_err(|err| IdentityError::Backend(err.to_string()))?;
        verify_password(password, &stored.password_hash)?;

        self.issue_id_token(&Identity {
            uid: stored.uid,
            email: stored.email,
            display_name: stored.display_name,
        })
    }

    async fn verify_id_token(&self, token: &str) -> IdentityResult<Identity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<IdTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|err| IdentityError::InvalidToken(err.to_string()))?
            .claims;

        Ok(Identity {
            uid: claims.sub,
            email: claims.email,
            display_name: claims.name,
        })
    }

    async fn delete_account(&self, identity: &Identity) -> IdentityResult<()> {
        let key = identity.email.to_lowercase();
        let stored = self
            .store
            .get(IDENTITIES, &key)
            .await
            .map_err(|err| IdentityError::Backend(err.to_string()))?;

        // The email may have been re-registered under another uid since.
        if stored.map_or(false, |document| document.data["uid"] == identity.uid.as_str()) {
            self.store
                .delete(IDENTITIES, &key)
                .await
                .map_err(|err| IdentityError::Backend(err.to_string()))?;
        }
        Ok(())
    }
}
