use crate::errors::ConfigError;
use axum_extra::extract::cookie::Key;
use dotenvy::dotenv;
use std::{env, fmt, net::SocketAddr, path::PathBuf};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const MIN_SECRET_KEY_BYTES: usize = 64;

/// Built once at startup and shared read-only with every handler.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_path: PathBuf,
    pub max_upload_bytes: usize,
    pub secret_key: Key,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_path", &self.storage_path)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Defaults for everything but the storage path, with a fresh signing key.
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            storage_path: storage_path.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            secret_key: Key::generate(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let secret_key = match lookup("SECRET_KEY") {
            Some(secret) if secret.len() < MIN_SECRET_KEY_BYTES => {
                return Err(ConfigError::SecretKeyTooShort(secret.len()));
            }
            Some(secret) => Key::from(secret.as_bytes()),
            None => {
                tracing::warn!(
                    "SECRET_KEY not set, generated a random key; status messages will not survive a restart"
                );
                Key::generate()
            }
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_number(&lookup, "PORT", 5000)?,
            storage_path: lookup("STORAGE_PATH")
                .unwrap_or_else(|| "./uploads".to_string())
                .into(),
            max_upload_bytes: parse_number(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            secret_key,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

fn parse_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
        None => Ok(default),
    }
}
