/*
 * Responsibility
 * - middleware の公開インターフェース
 * - cors::apply (route より先に評価), http::apply (最外層)
 */
pub mod cors;
pub mod http;
