//! Public keys used to check Firebase ID token signatures.
//!
//! Google rotates the signing keys and publishes them as a JWK set. The set is
//! cached for as long as the response's `Cache-Control: max-age` allows.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use reqwest::StatusCode;
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

/// Used when the key endpoint does not send a usable `max-age`.
const FALLBACK_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to fetch public keys: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("public key endpoint returned HTTP {0}")]
    Status(StatusCode),
    #[error("no public key matches kid {0:?}")]
    UnknownKid(String),
}

/// Looks up the verification key for a token's `kid` header.
#[async_trait]
pub trait PublicKeySource: Send + Sync {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError>;
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    expires_at: Instant,
}

impl CachedKeys {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }

    fn get(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyError::UnknownKid(kid.to_string()))
    }
}

/// JWK set fetched over HTTP and cached per `Cache-Control`.
pub struct GooglePublicKeys {
    url: Url,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl GooglePublicKeys {
    pub fn new(url: Url, client: reqwest::Client) -> Self {
        Self {
            url,
            client,
            cache: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedKeys, KeyError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(KeyError::Status(status));
        }

        let ttl = max_age(response.headers()).unwrap_or(FALLBACK_TTL);
        let jwks: JwkSet = response.json().await?;

        let keys: HashMap<String, DecodingKey> = jwks
            .keys
            .iter()
            .filter_map(|jwk| {
                let kid = jwk.common.key_id.clone()?;
                match DecodingKey::from_jwk(jwk) {
                    Ok(key) => Some((kid, key)),
                    Err(err) => {
                        tracing::warn!(kid = %kid, error = %err, "skipping unusable public key");
                        None
                    }
                }
            })
            .collect();

        tracing::debug!(
            url = %self.url,
            keys = keys.len(),
            ttl_seconds = ttl.as_secs(),
            "fetched public keys"
        );

        Ok(CachedKeys {
            keys,
            expires_at: Instant::now() + ttl,
        })
    }
}

#[async_trait]
impl PublicKeySource for GooglePublicKeys {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref().filter(|e| e.is_fresh()) {
                return entry.get(kid);
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed the set while we waited for the lock.
        if let Some(entry) = cache.as_ref().filter(|e| e.is_fresh()) {
            return entry.get(kid);
        }

        let fresh = self.fetch().await?;
        let key = fresh.get(kid);
        *cache = Some(fresh);
        key
    }
}

fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .find_map(|directive| directive.trim().strip_prefix("max-age=")?.parse::<u64>().ok())
        .map(Duration::from_secs)
}
