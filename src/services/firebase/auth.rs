use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::services::firebase::id_token::DecodedIdToken;
use crate::services::firebase::keys::{KeyError, PublicKeySource};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MAX_UID_LENGTH: usize = 128;

/// Reasons an ID token is rejected. Logged, never sent to the caller.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("id token must be a non-empty string")]
    Empty,
    #[error("malformed id token header: {0}")]
    Header(#[source] jsonwebtoken::errors::Error),
    #[error("id token has incorrect algorithm {0:?}, expected RS256")]
    Algorithm(Algorithm),
    #[error("id token has no 'kid' header")]
    MissingKid,
    #[error(transparent)]
    Keys(#[from] KeyError),
    #[error("id token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("malformed id token claims: {0}")]
    Claims(#[from] serde_json::Error),
    #[error("id token has 'iat' in the future")]
    IssuedInFuture,
    #[error("id token 'sub' must be a non-empty string of at most 128 characters")]
    InvalidSubject,
}

/// Verification operation handed out by an auth client.
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<DecodedIdToken, VerifyError>;
}

/// Firebase ID token verifier bound to one project.
///
/// Signature, `exp`, `aud` and `iss` checks are done by `jsonwebtoken`;
/// the Firebase-specific rules (`kid`, `sub`, `iat`) are checked here.
pub struct FirebaseAuth {
    project_id: String,
    validation: Validation,
    keys: Arc<dyn PublicKeySource>,
}

impl std::fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuth")
            .field("project_id", &self.project_id)
            .field("validation", &self.validation)
            .finish()
    }
}

impl FirebaseAuth {
    pub fn new(project_id: &str, leeway_seconds: u64, keys: Arc<dyn PublicKeySource>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[project_id]);
        validation.set_issuer(&[format!("{ISSUER_PREFIX}{project_id}")]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);
        validation.leeway = leeway_seconds;

        Self {
            project_id: project_id.to_string(),
            validation,
            keys,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseAuth {
    async fn verify_id_token(&self, id_token: &str) -> Result<DecodedIdToken, VerifyError> {
        if id_token.is_empty() {
            return Err(VerifyError::Empty);
        }

        let header = jsonwebtoken::decode_header(id_token).map_err(VerifyError::Header)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::Algorithm(header.alg));
        }
        let kid = header.kid.ok_or(VerifyError::MissingKid)?;

        let key = self.keys.decoding_key(&kid).await?;
        let data = jsonwebtoken::decode::<Map<String, Value>>(id_token, &key, &self.validation)?;
        let token = DecodedIdToken::from_payload(data.claims)?;

        let leeway = i64::try_from(self.validation.leeway).unwrap_or(i64::MAX);
        let latest_allowed = chrono::Utc::now().timestamp().saturating_add(leeway);
        if token.iat > latest_allowed {
            return Err(VerifyError::IssuedInFuture);
        }
        if token.sub.is_empty() || token.sub.len() > MAX_UID_LENGTH {
            return Err(VerifyError::InvalidSubject);
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::errors::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::test_support::{self, PROJECT_ID};

    fn verifier() -> FirebaseAuth {
        FirebaseAuth::new(PROJECT_ID, 0, test_support::static_keys())
    }

    #[tokio::test]
    async fn valid_token_is_decoded() {
        let token = test_support::sign(&test_support::claims("user-42"));

        let decoded = verifier().verify_id_token(&token).await.unwrap();

        assert_eq!(decoded.uid, "user-42");
        assert_eq!(decoded.aud, PROJECT_ID);
        assert_eq!(decoded.iss, format!("{ISSUER_PREFIX}{PROJECT_ID}"));
        assert_eq!(decoded.firebase.sign_in_provider, "password");
        assert_eq!(decoded.claims["email"], "user@example.com");
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let result = verifier().verify_id_token("").await;
        assert!(matches!(result, Err(VerifyError::Empty)));
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let result = verifier().verify_id_token("not-a-jwt").await;
        assert!(matches!(result, Err(VerifyError::Header(_))));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let mut claims = test_support::claims("user-42");
        let now = chrono::Utc::now().timestamp();
        claims["iat"] = json!(now - 7200);
        claims["exp"] = json!(now - 3600);

        let result = verifier().verify_id_token(&test_support::sign(&claims)).await;
        assert!(matches!(
            result,
            Err(VerifyError::Jwt(e)) if matches!(e.kind(), ErrorKind::ExpiredSignature)
        ));
    }

    #[tokio::test]
    async fn leeway_accepts_recently_expired_token() {
        let mut claims = test_support::claims("user-42");
        let now = chrono::Utc::now().timestamp();
        claims["exp"] = json!(now - 10);

        let auth = FirebaseAuth::new(PROJECT_ID, 60, test_support::static_keys());
        assert!(auth.verify_id_token(&test_support::sign(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let mut claims = test_support::claims("user-42");
        claims["aud"] = json!("another-project");

        let result = verifier().verify_id_token(&test_support::sign(&claims)).await;
        assert!(matches!(
            result,
            Err(VerifyError::Jwt(e)) if matches!(e.kind(), ErrorKind::InvalidAudience)
        ));
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let mut claims = test_support::claims("user-42");
        claims["iss"] = json!("https://accounts.google.com");

        let result = verifier().verify_id_token(&test_support::sign(&claims)).await;
        assert!(matches!(
            result,
            Err(VerifyError::Jwt(e)) if matches!(e.kind(), ErrorKind::InvalidIssuer)
        ));
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let token = test_support::sign_with(
            test_support::OTHER_KEY_PEM,
            Some(test_support::KID),
            &test_support::claims("user-42"),
        );

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(
            result,
            Err(VerifyError::Jwt(e)) if matches!(e.kind(), ErrorKind::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let token = test_support::sign_with(
            test_support::SIGNING_KEY_PEM,
            Some("unknown"),
            &test_support::claims("user-42"),
        );

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(result, Err(VerifyError::Keys(KeyError::UnknownKid(_)))));
    }

    #[tokio::test]
    async fn missing_kid_is_rejected() {
        let token = test_support::sign_with(
            test_support::SIGNING_KEY_PEM,
            None,
            &test_support::claims("user-42"),
        );

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(result, Err(VerifyError::MissingKid)));
    }

    #[tokio::test]
    async fn symmetric_algorithm_is_rejected() {
        let mut header = jsonwebtoken::Header::new(Algorithm::HS256);
        header.kid = Some(test_support::KID.to_string());
        let token = jsonwebtoken::encode(
            &header,
            &test_support::claims("user-42"),
            &jsonwebtoken::EncodingKey::from_secret(b"shared"),
        )
        .unwrap();

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(result, Err(VerifyError::Algorithm(Algorithm::HS256))));
    }

    #[tokio::test]
    async fn future_issued_at_is_rejected() {
        let mut claims = test_support::claims("user-42");
        claims["iat"] = json!(chrono::Utc::now().timestamp() + 600);

        let result = verifier().verify_id_token(&test_support::sign(&claims)).await;
        assert!(matches!(result, Err(VerifyError::IssuedInFuture)));
    }

    #[tokio::test]
    async fn leeway_accepts_slightly_future_issued_at() {
        let mut claims = test_support::claims("user-42");
        claims["iat"] = json!(chrono::Utc::now().timestamp() + 5);

        let auth = FirebaseAuth::new(PROJECT_ID, 60, test_support::static_keys());
        assert!(auth.verify_id_token(&test_support::sign(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn future_auth_time_is_not_checked() {
        let mut claims = test_support::claims("user-42");
        claims["auth_time"] = json!(chrono::Utc::now().timestamp() + 600);

        assert!(verifier().verify_id_token(&test_support::sign(&claims)).await.is_ok());
    }

    #[tokio::test]
    async fn oversized_subject_is_rejected() {
        let token = test_support::sign(&test_support::claims(&"x".repeat(129)));

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(result, Err(VerifyError::InvalidSubject)));
    }

    #[tokio::test]
    async fn empty_subject_is_rejected() {
        let token = test_support::sign(&test_support::claims(""));

        let result = verifier().verify_id_token(&token).await;
        assert!(matches!(result, Err(VerifyError::InvalidSubject)));
    }
}
