mod local;

pub use local::LocalIdentityProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    EmailExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid identity token: {0}")]
    InvalidToken(String),
    #[error("identity backend failure: {0}")]
    Backend(String),
}

pub type IdentityResult<T> = Result<T, IdentityError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

/// Issues and verifies user credentials. The rest of the service only ever
/// sees verified [`Identity`] values.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str, display_name: &str) -> IdentityResult<Identity>;

    /// Exchanges email and password for a short-lived identity token.
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<String>;

    async fn verify_id_token(&self, token: &str) -> IdentityResult<Identity>;

    /// Removes an account. Deleting an unknown account is not an error.
    async fn delete_account(&self, identity: &Identity) -> IdentityResult<()>;
}
