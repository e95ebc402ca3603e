/*
 * Responsibility
 * - POST /verify-id-token
 * - auth client 取得 → body parse → 検証の委譲 → JSON / plain text error
 * - 失敗理由はログにだけ出す (レスポンスには出さない)
 */
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::api::dto::verify_id_token::{VerifyIdTokenRequest, VerifyIdTokenResponse};
use crate::error::AppError;
use crate::state::AppState;

pub async fn verify_id_token(
    State(state): State<AppState>,
    payload: Result<Json<VerifyIdTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyIdTokenResponse>, AppError> {
    let client = state.auth.auth().await.map_err(|err| {
        tracing::error!(error = %err, "failed to get auth client");
        AppError::AuthClient
    })?;

    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected request body");
        AppError::InvalidRequest
    })?;
    req.validate().map_err(|reason| {
        tracing::debug!(reason, "rejected request body");
        AppError::InvalidRequest
    })?;

    let token = client.verify_id_token(&req.id_token).await.map_err(|err| {
        tracing::warn!(error = %err, "id token verification failed");
        AppError::Unauthorized
    })?;

    tracing::debug!(uid = %token.uid, "id token verified");

    Ok(Json(VerifyIdTokenResponse::from(token)))
}
