/*
 * Responsibility
 * - GET /health (load balancer / 疎通確認用)
 * - Firebase には触れない (key set の取得失敗で落ちないように)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
