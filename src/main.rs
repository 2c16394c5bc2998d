mod config;
mod db;
mod errors;
mod handlers;
mod identity;
mod middleware;
mod models;
mod routes;
mod storage;
mod utils;

#[cfg(test)]
mod testing;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::header::{self, HeaderName};
use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info, warn};

use crate::config::{Backend, Config};
use crate::db::{DocumentStore, MemoryDocumentStore, PgDocumentStore};
use crate::handlers::file::UploadSettings;
use crate::identity::{IdentityProvider, LocalIdentityProvider};
use crate::middleware::csrf::{verify_csrf, CSRF_HEADER};
use crate::storage::{create_s3_client, MemoryObjectStore, ObjectStore, S3ObjectStore};
use crate::utils::cookies::CookieSettings;
use crate::utils::jwt::SessionKeys;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers(vec![HeaderName::from_static("x-csrf-token")])
        .supports_credentials()
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Refuses to start without the session signing secret
    let config = Config::from_env().map_err(|err| startup_error("Invalid configuration", err))?;

    let (store, objects): (Arc<dyn DocumentStore>, Arc<dyn ObjectStore>) = match &config.backend {
        Backend::Postgres { database_url } => {
            let pool = db::create_pool(database_url)
                .await
                .map_err(|err| startup_error("Failed to connect to the database", err))?;
            let store = PgDocumentStore::new(pool);
            store
                .run_migrations()
                .await
                .map_err(|err| startup_error("Failed to run migrations", err))?;

            let s3_client = create_s3_client(config.aws_region.clone(), config.s3_endpoint.as_ref()).await;
            info!("Using Postgres documents and S3 bucket {}", config.bucket);
            (
                Arc::new(store) as Arc<dyn DocumentStore>,
                Arc::new(S3ObjectStore::new(
                    s3_client,
                    config.bucket.clone(),
                    config.s3_endpoint.clone(),
                )) as Arc<dyn ObjectStore>,
            )
        }
        Backend::Memory => {
            warn!("Using in-memory stores; all data is lost on shutdown");
            (
                Arc::new(MemoryDocumentStore::new()) as Arc<dyn DocumentStore>,
                Arc::new(MemoryObjectStore::new(config.bucket.clone())) as Arc<dyn ObjectStore>,
            )
        }
    };
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(LocalIdentityProvider::new(store.clone(), &config.identity_secret));

    let store = web::Data::from(store);
    let objects = web::Data::from(objects);
    let identity = web::Data::from(identity);
    let session_keys = web::Data::new(SessionKeys::new(&config.jwt_secret));
    let cookies = web::Data::new(CookieSettings {
        secure: config.secure_cookies,
    });
    let uploads = web::Data::new(UploadSettings {
        max_bytes: config.upload_limit,
        url_ttl: config.signed_url_ttl,
    });
    let json_limit = config.json_limit;
    let allowed_origins = config.allowed_origins.clone();

    info!("Starting server at {} (CSRF header {})", config.bind_address, CSRF_HEADER);

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(verify_csrf))
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(routes::json_config(json_limit))
            .app_data(store.clone())
            .app_data(objects.clone())
            .app_data(identity.clone())
            .app_data(session_keys.clone())
            .app_data(cookies.clone())
            .app_data(uploads.clone())
            .configure(routes::configure)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
