//! Shared fixtures for handler tests: in-memory collaborators, the app
//! builder macro and CSRF helpers.

use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::test::TestRequest;
use actix_web::web;
use async_trait::async_trait;

use crate::db::{DocumentStore, MemoryDocumentStore};
use crate::handlers::file::UploadSettings;
use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::middleware::csrf::CSRF_HEADER;
use crate::storage::{MemoryObjectStore, ObjectStore, StorageError, StorageResult};
use crate::utils::cookies::{CookieSettings, CSRF_COOKIE};
use crate::utils::jwt::SessionKeys;

pub const BUCKET: &str = "photos";
pub const SESSION_SECRET: &str = "test-session-secret";
pub const UPLOAD_LIMIT: usize = 1024;

pub struct TestContext {
    pub store: Arc<MemoryDocumentStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub identity: Arc<LocalIdentityProvider>,
    document_store: Arc<dyn DocumentStore>,
    object_store: Arc<dyn ObjectStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let objects = Arc::new(MemoryObjectStore::new(BUCKET));
        Self::build(store.clone(), store, objects.clone(), objects)
    }

    /// Handlers see `object_store`; `objects` stays available for inspection.
    pub fn with_object_store(object_store: Arc<dyn ObjectStore>) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        Self::build(store.clone(), store, Arc::new(MemoryObjectStore::new(BUCKET)), object_store)
    }

    /// Handlers see the store returned by `wrap`; the identity provider and
    /// `store` use the memory store underneath.
    pub fn with_document_store<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<MemoryDocumentStore>) -> Arc<dyn DocumentStore>,
    {
        let store = Arc::new(MemoryDocumentStore::new());
        let objects = Arc::new(MemoryObjectStore::new(BUCKET));
        Self::build(store.clone(), wrap(store), objects.clone(), objects)
    }

    fn build(
        store: Arc<MemoryDocumentStore>,
        document_store: Arc<dyn DocumentStore>,
        objects: Arc<MemoryObjectStore>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        let identity = Arc::new(LocalIdentityProvider::new(store.clone(), "test-identity-secret"));
        Self {
            store,
            objects,
            identity,
            document_store,
            object_store,
        }
    }

    pub fn documents(&self) -> web::Data<dyn DocumentStore> {
        web::Data::from(self.document_store.clone())
    }

    pub fn object_store(&self) -> web::Data<dyn ObjectStore> {
        web::Data::from(self.object_store.clone())
    }

    pub fn identity_provider(&self) -> web::Data<dyn IdentityProvider> {
        web::Data::from(self.identity.clone() as Arc<dyn IdentityProvider>)
    }

    pub fn session_keys(&self) -> web::Data<SessionKeys> {
        web::Data::new(SessionKeys::new(SESSION_SECRET))
    }

    pub fn cookie_settings(&self) -> web::Data<CookieSettings> {
        web::Data::new(CookieSettings { secure: true })
    }

    pub fn upload_settings(&self) -> web::Data<UploadSettings> {
        web::Data::new(UploadSettings {
            max_bytes: UPLOAD_LIMIT,
            url_ttl: Duration::from_secs(3600),
        })
    }
}

/// Builds the full application (routes, CSRF middleware, JSON config) over a [`TestContext`].
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_web::middleware::from_fn(
                    $crate::middleware::csrf::verify_csrf,
                ))
                .app_data($crate::routes::json_config(64 * 1024))
                .app_data($ctx.documents())
                .app_data($ctx.object_store())
                .app_data($ctx.identity_provider())
                .app_data($ctx.session_keys())
                .app_data($ctx.cookie_settings())
                .app_data($ctx.upload_settings())
                .configure($crate::routes::configure),
        )
        .await
    };
}

/// Fetches a CSRF cookie from the running test app.
macro_rules! csrf_cookie {
    ($app:expr) => {{
        let resp = actix_web::test::call_service(
            &$app,
            actix_web::test::TestRequest::get()
                .uri("/api/csrf-token")
                .to_request(),
        )
        .await;
        $crate::testing::csrf_cookie_from(&resp)
    }};
}

pub(crate) use csrf_cookie;
pub(crate) use test_app;

pub fn csrf_cookie_from<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == CSRF_COOKIE)
        .map(|cookie| cookie.into_owned())
        .expect("csrf-token endpoint must set the csrf cookie")
}

pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.into_owned())
}

/// Attaches the double-submit pair to a state-changing request.
pub fn with_csrf(req: TestRequest, cookie: &Cookie<'static>) -> TestRequest {
    req.cookie(cookie.clone())
        .insert_header((CSRF_HEADER, cookie.value().to_string()))
}

pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

const BOUNDARY: &str = "----employee-directory-boundary";

/// Encodes `parts` as multipart/form-data, returning the content type header and body.
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// Object store that fails every call.
pub struct FailingObjectStore;

#[async_trait]
impl ObjectStore for FailingObjectStore {
    async fn put(&self, _key: &str, _body: web::Bytes, _content_type: &str) -> StorageResult<()> {
        Err(StorageError::Request("bucket unavailable".to_string()))
    }

    async fn signed_url(&self, _key: &str, _expires_in: Duration) -> StorageResult<String> {
        Err(StorageError::Request("bucket unavailable".to_string()))
    }

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Request("bucket unavailable".to_string()))
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&format!("memory://{}/", BUCKET))
            .map(|key| key.split('?').next().unwrap_or(key).to_string())
    }
}
