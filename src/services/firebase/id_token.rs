use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Registered claims that are lifted into `DecodedIdToken` fields and
/// therefore left out of `claims`.
const REGISTERED_CLAIMS: [&str; 6] = ["iss", "aud", "exp", "iat", "sub", "uid"];

/// A verified Firebase ID token.
///
/// `claims` holds every payload claim except the registered ones above, so
/// `auth_time`, `firebase`, `email` and custom claims appear there too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedIdToken {
    pub auth_time: i64,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub sub: String,
    pub uid: String,
    pub firebase: FirebaseInfo,
    pub claims: Map<String, Value>,
}

/// The `firebase` claim: sign-in provider, tenant and linked identities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirebaseInfo {
    #[serde(default)]
    pub sign_in_provider: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub identities: Map<String, Value>,
}

#[derive(Deserialize)]
struct RegisteredClaims {
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
    sub: String,
    #[serde(default)]
    auth_time: i64,
    #[serde(default)]
    firebase: FirebaseInfo,
}

impl DecodedIdToken {
    /// Split a verified JWT payload into registered fields and the remaining claims.
    pub fn from_payload(mut payload: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let registered: RegisteredClaims =
            serde_json::from_value(Value::Object(payload.clone()))?;

        for claim in REGISTERED_CLAIMS {
            payload.remove(claim);
        }

        Ok(Self {
            auth_time: registered.auth_time,
            iss: registered.iss,
            aud: registered.aud,
            exp: registered.exp,
            iat: registered.iat,
            uid: registered.sub.clone(),
            sub: registered.sub,
            firebase: registered.firebase,
            claims: payload,
        })
    }
}
