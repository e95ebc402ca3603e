/*
 * Responsibility
 * - URL 構造を定義
 * - /health と /verify-id-token
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{health::health, verify_id_token::verify_id_token};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/verify-id-token", post(verify_id_token))
}
