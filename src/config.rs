use std::env;
use std::time::Duration;

use url::Url;

/// SigV4 presigned URLs cannot live longer than a week.
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    /// Postgres documents and S3 objects.
    Postgres { database_url: String },
    /// Process-local stores, for development.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub backend: Backend,
    pub bucket: String,
    pub aws_region: Option<String>,
    /// S3-compatible endpoint (MinIO, localstack). Unset means AWS.
    pub s3_endpoint: Option<Url>,
    pub jwt_secret: String,
    pub identity_secret: String,
    pub json_limit: usize,
    pub upload_limit: usize,
    pub signed_url_ttl: Duration,
    pub secure_cookies: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        let identity_secret = required(&lookup, "IDENTITY_SECRET")?;

        let backend_name = lookup("APP_BACKEND").unwrap_or_else(|| "postgres".to_string());
        let (backend, bucket) = match backend_name.to_lowercase().as_str() {
            "postgres" => (
                Backend::Postgres {
                    database_url: required(&lookup, "DATABASE_URL")?,
                },
                required(&lookup, "AWS_S3_BUCKET")?,
            ),
            "memory" => (
                Backend::Memory,
                lookup("AWS_S3_BUCKET").unwrap_or_else(|| "local".to_string()),
            ),
            _ => {
                return Err(ConfigError::Invalid {
                    name: "APP_BACKEND",
                    value: backend_name,
                })
            }
        };

        let ttl_secs: u64 = parsed(&lookup, "SIGNED_URL_TTL_SECS", MAX_SIGNED_URL_TTL_SECS)?;
        if ttl_secs == 0 || ttl_secs > MAX_SIGNED_URL_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "SIGNED_URL_TTL_SECS",
                value: ttl_secs.to_string(),
            });
        }

        let s3_endpoint = match lookup("S3_ENDPOINT_URL") {
            None => None,
            Some(value) => match Url::parse(value.trim()) {
                Ok(url) if url.host_str().is_some() => Some(url),
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "S3_ENDPOINT_URL",
                        value,
                    })
                }
            },
        };

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            backend,
            bucket,
            aws_region: lookup("AWS_REGION"),
            s3_endpoint,
            jwt_secret,
            identity_secret,
            json_limit: parsed(&lookup, "JSON_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
            upload_limit: parsed(&lookup, "UPLOAD_LIMIT_BYTES", DEFAULT_BODY_LIMIT)?,
            signed_url_ttl: Duration::from_secs(ttl_secs),
            secure_cookies: parsed(&lookup, "SECURE_COOKIES", true)?,
            allowed_origins,
        })
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}
