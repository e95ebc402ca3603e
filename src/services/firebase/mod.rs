pub mod app;
pub mod auth;
pub mod id_token;
pub mod keys;

pub use app::{AuthClientError, AuthProvider, BootstrapError, FirebaseApp};
pub use auth::{FirebaseAuth, IdTokenVerifier};
pub use id_token::DecodedIdToken;
