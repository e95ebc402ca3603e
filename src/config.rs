/*
 * Responsibility
 * - 環境変数の読み込み (GOOGLE_APPLICATION_CREDENTIALS, CORS 許可, timeout など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use url::Url;

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
// Clock skew tolerated on `iat` / `exp`, same as the Firebase Admin SDKs.
const DEFAULT_TOKEN_LEEWAY_SECONDS: u64 = 300;
const MAX_TOKEN_LEEWAY_SECONDS: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(CREDENTIALS_ENV) => write!(
                f,
                "missing configuration: {} must be set to the path of a service account key JSON file",
                CREDENTIALS_ENV
            ),
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // Service account key file
    pub credentials_path: PathBuf,
    // Overrides `project_id` from the key file when set
    pub project_id: Option<String>,

    pub cors_allowed_origins: Vec<HeaderValue>,

    pub jwks_url: Url,
    pub token_leeway_seconds: u64,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port: u16 = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            None => DEFAULT_PORT,
        };

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let credentials_path = get(CREDENTIALS_ENV)
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing(CREDENTIALS_ENV))?;

        let project_id = get("FIREBASE_PROJECT_ID");

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            // Exact origins only; a wildcard would also defeat the allowlist.
            .map(|s| match s {
                "*" => Err(ConfigError::Invalid("CORS_ALLOWED_ORIGINS")),
                _ => HeaderValue::from_str(s)
                    .map_err(|_| ConfigError::Invalid("CORS_ALLOWED_ORIGINS")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let jwks_url = get("FIREBASE_JWKS_URL")
            .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());
        let jwks_url = Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("FIREBASE_JWKS_URL"))?;

        let token_leeway_seconds = match get("TOKEN_LEEWAY_SECONDS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|s| *s <= MAX_TOKEN_LEEWAY_SECONDS)
                .ok_or(ConfigError::Invalid("TOKEN_LEEWAY_SECONDS"))?,
            None => DEFAULT_TOKEN_LEEWAY_SECONDS,
        };

        let request_timeout = match get("REQUEST_TIMEOUT_SECONDS") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid("REQUEST_TIMEOUT_SECONDS"))?,
            None => Duration::from_secs(30),
        };

        let request_body_limit_bytes = match get("REQUEST_BODY_LIMIT_BYTES") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| ConfigError::Invalid("REQUEST_BODY_LIMIT_BYTES"))?,
            None => 64 * 1024,
        };

        Ok(Self {
            addr,
            app_env,
            credentials_path,
            project_id,
            cors_allowed_origins,
            jwks_url,
            token_leeway_seconds,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}
