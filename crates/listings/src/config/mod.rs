use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEV_JWT_SECRET: &str = "urban-nest-development-secret";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            auth: AuthConfig::load(environment)?,
            storage: StorageConfig::load()?,
            pagination: PaginationConfig::load()?,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn numeric_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match optional_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Shared-secret token verification settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
}

impl AuthConfig {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let jwt_secret = match optional_var("AUTH_JWT_SECRET") {
            Some(secret) => secret,
            None if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingSecret)
            }
            None => DEV_JWT_SECRET.to_string(),
        };

        Ok(Self {
            jwt_secret,
            jwt_issuer: optional_var("AUTH_JWT_ISSUER"),
        })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

/// Object storage selection and presigned URL lifetimes.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: Option<String>,
    pub public_base_url: String,
    pub upload_ttl: Duration,
    pub download_ttl: Duration,
}

impl StorageConfig {
    fn load() -> Result<Self, ConfigError> {
        let backend = match optional_var("STORAGE_BACKEND")
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("local") => StorageBackend::Local,
            Some("s3") => StorageBackend::S3,
            Some(other) => return Err(ConfigError::InvalidStorageBackend(other.to_string())),
        };

        let bucket = optional_var("STORAGE_BUCKET");
        if backend == StorageBackend::S3 && bucket.is_none() {
            return Err(ConfigError::MissingBucket);
        }

        Ok(Self {
            backend,
            bucket,
            public_base_url: optional_var("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://127.0.0.1:3000/media".to_string()),
            upload_ttl: Duration::from_secs(numeric_var("STORAGE_UPLOAD_TTL_SECS", 900)?),
            download_ttl: Duration::from_secs(numeric_var("STORAGE_DOWNLOAD_TTL_SECS", 3600)?),
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            bucket: None,
            public_base_url: "http://127.0.0.1:3000/media".to_string(),
            upload_ttl: Duration::from_secs(900),
            download_ttl: Duration::from_secs(3600),
        }
    }
}

/// Page size defaults applied to every list and search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl PaginationConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let default_page_size = numeric_var("PAGE_DEFAULT_SIZE", defaults.default_page_size)?;
        let max_page_size = numeric_var("PAGE_MAX_SIZE", defaults.max_page_size)?;
        if default_page_size == 0 || max_page_size < default_page_size {
            return Err(ConfigError::InvalidPageSize {
                default_page_size,
                max_page_size,
            });
        }

        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    MissingSecret,
    InvalidStorageBackend(String),
    MissingBucket,
    InvalidNumber {
        name: &'static str,
        value: String,
    },
    InvalidPageSize {
        default_page_size: u32,
        max_page_size: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingSecret => {
                write!(f, "AUTH_JWT_SECRET must be set in production")
            }
            ConfigError::InvalidStorageBackend(value) => {
                write!(f, "STORAGE_BACKEND must be 'local' or 's3', got '{value}'")
            }
            ConfigError::MissingBucket => {
                write!(f, "STORAGE_BUCKET is required when STORAGE_BACKEND=s3")
            }
            ConfigError::InvalidNumber { name, value } => {
                write!(f, "{name} must be a non-negative integer, got '{value}'")
            }
            ConfigError::InvalidPageSize {
                default_page_size,
                max_page_size,
            } => write!(
                f,
                "PAGE_DEFAULT_SIZE ({default_page_size}) must be positive and not exceed PAGE_MAX_SIZE ({max_page_size})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "AUTH_JWT_SECRET",
            "AUTH_JWT_ISSUER",
            "STORAGE_BACKEND",
            "STORAGE_BUCKET",
            "STORAGE_PUBLIC_BASE_URL",
            "STORAGE_UPLOAD_TTL_SECS",
            "STORAGE_DOWNLOAD_TTL_SECS",
            "PAGE_DEFAULT_SIZE",
            "PAGE_MAX_SIZE",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.auth.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.storage.upload_ttl, Duration::from_secs(900));
        assert_eq!(config.storage.download_ttl, Duration::from_secs(3600));
        assert_eq!(config.pagination, PaginationConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn production_requires_jwt_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        assert!(matches!(AppConfig::load(), Err(ConfigError::MissingSecret)));
        reset_env();
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("STORAGE_BACKEND", "s3");
        assert!(matches!(AppConfig::load(), Err(ConfigError::MissingBucket)));

        env::set_var("STORAGE_BUCKET", "urban-nest-media");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.bucket.as_deref(), Some("urban-nest-media"));
        reset_env();
    }

    #[test]
    fn rejects_default_page_size_above_maximum() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAGE_DEFAULT_SIZE", "50");
        env::set_var("PAGE_MAX_SIZE", "10");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidPageSize { .. })
        ));
        reset_env();
    }
}
