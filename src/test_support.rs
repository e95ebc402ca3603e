//! Shared fixtures for unit and router tests.
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde_json::{Value, json};
use url::Url;

use crate::config::{CREDENTIALS_ENV, Config};
use crate::services::firebase::keys::{KeyError, PublicKeySource};

pub const PROJECT_ID: &str = "demo-project";
pub const CLIENT_EMAIL: &str = "firebase-adminsdk@demo-project.iam.gserviceaccount.com";
pub const KID: &str = "test-kid";

pub const SIGNING_KEY_PEM: &str = include_str!("../testdata/signing_key.pem");
pub const PUBLIC_KEY_PEM: &str = include_str!("../testdata/signing_key.pub.pem");
pub const OTHER_KEY_PEM: &str = include_str!("../testdata/other_key.pem");
/// JWK set containing the public half of `SIGNING_KEY_PEM` under `KID`.
pub const JWKS_JSON: &str = include_str!("../testdata/jwks.json");

/// Fixed key set, no network.
pub struct StaticKeys(HashMap<String, DecodingKey>);

#[async_trait]
impl PublicKeySource for StaticKeys {
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, KeyError> {
        self.0
            .get(kid)
            .cloned()
            .ok_or_else(|| KeyError::UnknownKid(kid.to_string()))
    }
}

pub fn static_keys() -> Arc<dyn PublicKeySource> {
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY_PEM.as_bytes()).unwrap();
    Arc::new(StaticKeys(HashMap::from([(KID.to_string(), key)])))
}

/// Claims of a fresh token for `sub` issued to `PROJECT_ID`.
pub fn claims(sub: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    json!({
        "iss": format!("https://securetoken.google.com/{PROJECT_ID}"),
        "aud": PROJECT_ID,
        "auth_time": now - 60,
        "iat": now - 30,
        "exp": now + 3600,
        "sub": sub,
        "user_id": sub,
        "email": "user@example.com",
        "email_verified": true,
        "firebase": {
            "sign_in_provider": "password",
            "identities": { "email": ["user@example.com"] }
        }
    })
}

pub fn sign(claims: &Value) -> String {
    sign_with(SIGNING_KEY_PEM, Some(KID), claims)
}

pub fn sign_with(private_key_pem: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn service_account_json() -> Value {
    json!({
        "type": "service_account",
        "project_id": PROJECT_ID,
        "private_key_id": "0123456789abcdef",
        "private_key": SIGNING_KEY_PEM,
        "client_email": CLIENT_EMAIL,
        "client_id": "100000000000000000000",
        "token_uri": "https://oauth2.googleapis.com/token"
    })
}

pub fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub fn service_account_file() -> tempfile::NamedTempFile {
    write_temp(&service_account_json().to_string())
}

pub fn config(credentials_path: &Path) -> Config {
    let path = credentials_path.to_string_lossy().into_owned();
    Config::from_lookup(|key| (key == CREDENTIALS_ENV).then(|| path.clone())).unwrap()
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}
