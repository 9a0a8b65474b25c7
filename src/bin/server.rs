//! Thin HTTP server binary: wires up `codex_core::http::router` over the
//! env-configured codex directory and binds a TCP listener.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use codex_core::config::CodexConfig;
use codex_core::http::{router, AppState};
use codex_core::jobs::JobEngine;
use codex_core::plugin::{CredentialVault, PluginCatalog, PluginRegistry};
use codex_core::repository::Repository;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let codex_root = std::env::var("CODEX_ROOT").unwrap_or_else(|_| ".codex".to_string());
    let config = CodexConfig::new(PathBuf::from(codex_root));

    let repo = Repository::new(&config);
    let registry = Arc::new(PluginRegistry::new(Duration::from_secs(config.plugin_dispatch_timeout_secs)));
    let vault = Arc::new(
        CredentialVault::load(config.credentials_path())
            .await
            .expect("loading credential vault"),
    );
    let catalog = Arc::new(
        PluginCatalog::load(config.plugins_catalog_path(), registry.clone(), vault.clone())
            .await
            .expect("loading plugin catalog"),
    );
    catalog.bootstrap().await.expect("bootstrapping plugins");
    let jobs = JobEngine::new(config.jobs_dir(), registry.clone(), Duration::from_secs(config.job_timeout_secs));

    let state = Arc::new(AppState {
        repo,
        registry,
        catalog,
        vault,
        jobs,
        config,
    });

    let app = router(state);

    let addr = std::env::var("CODEX_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    tracing::info!(%addr, "codex-core HTTP server starting");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("binding listener");
    axum::serve(listener, app).await.expect("serving http");
}
