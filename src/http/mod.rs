//! The axum HTTP surface (§6): codex object/commit/merge/export endpoints
//! plus plugin admin. One handler function per route, assembled into a
//! single `Router` the binary just binds to a listener.

pub mod codex;
pub mod jobs;
pub mod plugins;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::config::CodexConfig;
use crate::jobs::JobEngine;
use crate::plugin::{CredentialVault, PluginCatalog, PluginRegistry};
use crate::repository::Repository;

pub struct AppState {
    pub repo: Repository,
    pub registry: Arc<PluginRegistry>,
    pub catalog: Arc<PluginCatalog>,
    pub vault: Arc<CredentialVault>,
    pub jobs: Arc<JobEngine>,
    pub config: CodexConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/codex/status", get(codex::status))
        .route(
            "/api/codex/object",
            get(codex::get_object).post(codex::post_object),
        )
        .route("/api/codex/query", post(codex::query_objects))
        .route("/api/codex/commit", get(codex::get_commit).post(codex::post_commit))
        .route("/api/codex/commits", get(codex::list_commits))
        .route("/api/codex/diff", get(codex::diff))
        .route("/api/codex/merge", post(codex::merge))
        .route("/api/codex/export", get(codex::export))
        .route("/api/plugins", get(plugins::list_plugins))
        .route("/api/plugin-execute", post(plugins::execute_plugin))
        .route("/api/credentials", post(plugins::store_credential))
        .route(
            "/api/plugins-registry",
            get(plugins::list_catalog)
                .post(plugins::create_catalog_row)
                .put(plugins::update_catalog_row)
                .delete(plugins::delete_catalog_row),
        )
        .route("/api/publish-jobs", get(jobs::get_job).post(jobs::enqueue_job))
        .with_state(state)
}
