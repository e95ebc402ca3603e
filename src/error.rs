/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / plain text body)
 * - 失敗理由の詳細はログにのみ出し、レスポンスには含めない
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request")]
    InvalidRequest,

    #[error("Invalid ID token")]
    Unauthorized,

    #[error("Failed to get Auth client")]
    AuthClient,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::AuthClient => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // `String` responses are sent as text/plain; charset=utf-8
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use super::*;

    #[test]
    fn errors_map_to_plain_text_responses() {
        let cases = [
            (AppError::InvalidRequest, StatusCode::BAD_REQUEST),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::AuthClient, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let res = err.into_response();
            assert_eq!(res.status(), status);
            assert_eq!(
                res.headers().get(header::CONTENT_TYPE).unwrap(),
                "text/plain; charset=utf-8"
            );
        }
    }
}
