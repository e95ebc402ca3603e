//! Process-wide Firebase handle built from a service account key file.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::Config;
use crate::services::firebase::auth::{FirebaseAuth, IdTokenVerifier};
use crate::services::firebase::keys::GooglePublicKeys;

const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup failures. Any of these stops the process before it listens.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("failed to read credentials file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credentials file {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("credentials file has type {0:?}, expected \"service_account\"")]
    NotServiceAccount(String),
    #[error("credentials file is missing '{0}'")]
    MissingField(&'static str),
    #[error("credentials file has an unusable private key: {0}")]
    PrivateKey(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Error)]
#[error("failed to build auth client: {0}")]
pub struct AuthClientError(#[from] reqwest::Error);

/// Hands out the auth client used by request handlers.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn auth(&self) -> Result<Arc<dyn IdTokenVerifier>, AuthClientError>;
}

// Only the fields needed to bind the handle; the rest of the key file is ignored.
#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    key_type: String,
    #[serde(default)]
    project_id: String,
    #[serde(default)]
    private_key: String,
    #[serde(default)]
    client_email: String,
}

impl ServiceAccountKey {
    fn from_file(path: &Path) -> Result<Self, BootstrapError> {
        let raw = std::fs::read(path).map_err(|source| BootstrapError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_slice(&raw).map_err(|source| BootstrapError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Credential-bound handle for one Firebase project.
///
/// Cheap to clone. The auth client is created on first use and shared afterwards.
#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<AppInner>,
}

struct AppInner {
    project_id: String,
    client_email: String,
    jwks_url: Url,
    token_leeway_seconds: u64,
    auth: OnceCell<Arc<FirebaseAuth>>,
}

impl std::fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("project_id", &self.inner.project_id)
            .field("client_email", &self.inner.client_email)
            .finish()
    }
}

impl FirebaseApp {
    /// Load and validate the service account key named by the config.
    ///
    /// No network access happens here; the key set is fetched on first verification.
    pub fn from_config(config: &Config) -> Result<Self, BootstrapError> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;

        if key.key_type != "service_account" {
            return Err(BootstrapError::NotServiceAccount(key.key_type));
        }

        let project_id = config
            .project_id
            .clone()
            .or_else(|| Some(key.project_id).filter(|p| !p.trim().is_empty()))
            .ok_or(BootstrapError::MissingField("project_id"))?;

        if key.client_email.trim().is_empty() {
            return Err(BootstrapError::MissingField("client_email"));
        }
        if key.private_key.trim().is_empty() {
            return Err(BootstrapError::MissingField("private_key"));
        }
        // Reject keys the provider would refuse later on.
        EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(BootstrapError::PrivateKey)?;

        Ok(Self {
            inner: Arc::new(AppInner {
                project_id,
                client_email: key.client_email,
                jwks_url: config.jwks_url.clone(),
                token_leeway_seconds: config.token_leeway_seconds,
                auth: OnceCell::new(),
            }),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub fn client_email(&self) -> &str {
        &self.inner.client_email
    }

    async fn build_auth(&self) -> Result<Arc<FirebaseAuth>, AuthClientError> {
        let client = reqwest::Client::builder()
            .timeout(KEY_FETCH_TIMEOUT)
            .build()?;
        let keys = Arc::new(GooglePublicKeys::new(self.inner.jwks_url.clone(), client));

        let auth = FirebaseAuth::new(
            &self.inner.project_id,
            self.inner.token_leeway_seconds,
            keys,
        );
        tracing::debug!(project_id = %auth.project_id(), "auth client created");

        Ok(Arc::new(auth))
    }
}

#[async_trait]
impl AuthProvider for FirebaseApp {
    async fn auth(&self) -> Result<Arc<dyn IdTokenVerifier>, AuthClientError> {
        let auth = self
            .inner
            .auth
            .get_or_try_init(|| self.build_auth())
            .await?;

        Ok(auth.clone())
    }
}
