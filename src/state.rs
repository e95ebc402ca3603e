/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: 起動時に作った credential handle (read-only, 全リクエストで共有)
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::services::firebase::AuthProvider;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self { auth }
    }
}
