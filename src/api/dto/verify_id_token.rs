use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::firebase::DecodedIdToken;

/// Request body for `POST /verify-id-token`.
///
/// Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyIdTokenRequest {
    pub id_token: String,
}

impl VerifyIdTokenRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.id_token.trim().is_empty() {
            return Err("idToken must not be empty");
        }
        Ok(())
    }
}

/// `claims` is repeated inside `token`; both are kept so existing clients keep working.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyIdTokenResponse {
    pub uid: String,
    pub claims: Map<String, Value>,
    pub token: DecodedIdToken,
}

impl From<DecodedIdToken> for VerifyIdTokenResponse {
    fn from(token: DecodedIdToken) -> Self {
        Self {
            uid: token.uid.clone(),
            claims: token.claims.clone(),
            token,
        }
    }
}
