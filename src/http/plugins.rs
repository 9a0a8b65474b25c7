//! Plugin admin handlers (§6): registry inspection/dispatch, the credential
//! vault's write path, and CRUD over the persisted enablement catalog.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::CodexError;
use crate::http::AppState;
use crate::model::PluginRecord;

pub async fn list_plugins(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.list_names().await)
}

#[derive(Deserialize)]
pub struct ExecuteBody {
    plugin: String,
    action: String,
    #[serde(default)]
    payload: Value,
}

pub async fn execute_plugin(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<Value>, CodexError> {
    let result = state.registry.execute(&body.plugin, &body.action, body.payload).await?;
    Ok(Json(result))
}

#[derive(Deserialize)]
pub struct StoreCredentialBody {
    key: String,
    value: String,
}

pub async fn store_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StoreCredentialBody>,
) -> Result<impl IntoResponse, CodexError> {
    state.vault.store(&body.key, &body.value).persist().await?;
    Ok((StatusCode::CREATED, Json(json!({"stored": body.key}))))
}

pub async fn list_catalog(State(state): State<Arc<AppState>>) -> Json<Vec<PluginRecord>> {
    Json(state.catalog.list().await)
}

#[derive(Deserialize)]
pub struct CreateCatalogBody {
    name: String,
    slug: String,
    #[serde(default)]
    manifest: String,
}

pub async fn create_catalog_row(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCatalogBody>,
) -> Result<impl IntoResponse, CodexError> {
    let manifest = if body.manifest.is_empty() { "{}".to_string() } else { body.manifest };
    let row = state.catalog.create(body.name, body.slug, manifest).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Deserialize)]
pub struct UpdateCatalogBody {
    id: Option<Uuid>,
    name: Option<String>,
    slug: String,
    #[serde(default)]
    manifest: String,
    enabled: bool,
}

/// Updates an existing row by `id`, or upserts by `slug` when no `id` is
/// given — the scenario in §8 PUTs `{slug, enabled, manifest}` directly
/// without a prior create.
pub async fn update_catalog_row(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateCatalogBody>,
) -> Result<Json<PluginRecord>, CodexError> {
    let row = match body.id {
        Some(id) => state.catalog.get(id).await?,
        None => {
            let existing = state.catalog.list().await.into_iter().find(|r| r.slug == body.slug);
            match existing {
                Some(row) => row,
                None => {
                    let manifest = if body.manifest.is_empty() { "{}".to_string() } else { body.manifest.clone() };
                    let name = body.name.clone().unwrap_or_else(|| body.slug.clone());
                    state.catalog.create(name, body.slug.clone(), manifest).await?
                }
            }
        }
    };
    let updated = state.catalog.set_enabled(row.id, body.enabled).await?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct DeleteCatalogQuery {
    id: Uuid,
}

pub async fn delete_catalog_row(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DeleteCatalogQuery>,
) -> Result<impl IntoResponse, CodexError> {
    state.catalog.delete(q.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
