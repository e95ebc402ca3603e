/*
 * Responsibility
 * - Config 読み込み → credential handle 生成 → Router 組み立て
 * - Middleware の適用 (CORS / request-id / trace / limit / timeout)
 * - axum::serve() で起動
 * - 起動前の失敗 (Config / Bootstrap) は listener を開かずに終了する
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::services::firebase::{BootstrapError, FirebaseApp};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,id_token_verifier=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so the panic is noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::from_env().inspect_err(|err| {
        tracing::error!(error = %err, "failed to load configuration");
    })?;

    init_panic_hook(!config.app_env.is_production());

    let app = build_app(&config).inspect_err(|err| {
        tracing::error!(error = %err, "failed to initialize Firebase");
    })?;

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!(
        "server started at {} in {:?} mode",
        config.addr,
        config.app_env
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Build the process-level handle and the full router.
///
/// Fails without side effects when the credential file is unusable, so the
/// caller never gets as far as binding the listener.
pub fn build_app(config: &Config) -> Result<Router, BootstrapError> {
    let firebase = FirebaseApp::from_config(config)?;

    tracing::info!(
        project_id = %firebase.project_id(),
        client_email = %firebase.client_email(),
        "firebase app initialized"
    );

    let state = AppState::new(Arc::new(firebase));
    Ok(build_router(state, config))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes().with_state(state);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
