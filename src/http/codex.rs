//! Handlers for the `/api/codex/*` surface: object storage, commit
//! creation/history, diff, merge, and export.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;

use crate::errors::CodexError;
use crate::export;
use crate::http::AppState;
use crate::model::Commit;
use crate::repository::MergeOutcome;

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, CodexError> {
    let objects_count = state.repo.objects.list_objects("").await?.len();
    Ok(Json(json!({
        "objects_dir": state.config.objects_dir().to_string_lossy(),
        "objects_count": objects_count,
        "checked_at": Utc::now(),
    })))
}

#[derive(Deserialize)]
pub struct HashQuery {
    hash: String,
}

pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HashQuery>,
) -> Result<Response, CodexError> {
    let (file, content_type) = state.repo.objects.get_object_stream(&q.hash).await?;
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        body,
    )
        .into_response())
}

pub async fn post_object(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, CodexError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let hash = state
        .repo
        .put_object_stream_with_filename(std::io::Cursor::new(body.to_vec()), &content_type, None)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({"status": "created", "hash": hash.as_hex()})),
    )
        .into_response())
}

#[derive(Deserialize)]
pub struct QueryBody {
    #[serde(default)]
    prefix: String,
}

pub async fn query_objects(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryBody>,
) -> Result<Json<serde_json::Value>, CodexError> {
    let objects = state.repo.objects.list_objects(&body.prefix).await?;
    Ok(Json(json!({"count": objects.len(), "objects": objects})))
}

pub async fn post_commit(
    State(state): State<Arc<AppState>>,
    Json(commit): Json<Commit>,
) -> Result<Response, CodexError> {
    let commit = state.repo.put_commit(commit).await?;
    Ok((StatusCode::CREATED, Json(json!({"status": "created", "hash": commit.hash}))).into_response())
}

pub async fn get_commit(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HashQuery>,
) -> Result<Json<Commit>, CodexError> {
    Ok(Json(state.repo.get_commit(&q.hash).await?))
}

#[derive(Deserialize)]
pub struct ListCommitsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn list_commits(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListCommitsQuery>,
) -> Result<Json<Vec<Commit>>, CodexError> {
    Ok(Json(state.repo.list_commits(q.limit, q.offset).await?))
}

#[derive(Deserialize)]
pub struct DiffQuery {
    from: String,
    to: String,
}

pub async fn diff(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DiffQuery>,
) -> Result<Json<serde_json::Value>, CodexError> {
    let result = state.repo.diff(&q.from, &q.to).await?;
    Ok(Json(json!({
        "added": result.added,
        "removed": result.removed,
        "modified": result.modified,
    })))
}

#[derive(Deserialize)]
pub struct MergeBody {
    base: Option<String>,
    ours: String,
    theirs: String,
    author: String,
    message: String,
}

pub async fn merge(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MergeBody>,
) -> Result<Response, CodexError> {
    let outcome = state
        .repo
        .merge_commits(body.base, &body.ours, &body.theirs, body.author, body.message)
        .await?;
    match outcome {
        MergeOutcome::Merged(commit) => {
            Ok((StatusCode::CREATED, Json(json!({"hash": commit.hash}))).into_response())
        }
        MergeOutcome::Conflicts(conflicts) => {
            Ok((StatusCode::CONFLICT, Json(json!({"conflicts": conflicts}))).into_response())
        }
    }
}

#[derive(Deserialize)]
pub struct ExportQuery {
    hash: String,
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "zip".to_string()
}

pub async fn export(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ExportQuery>,
) -> Result<Response, CodexError> {
    let commit = state.repo.get_commit(&q.hash).await?;
    match q.format.as_str() {
        "zip" => {
            let buf = export::export_zip(&state.repo, &commit, std::io::Cursor::new(Vec::new())).await?;
            let bytes = buf.into_inner();
            let disposition = format!("attachment; filename=codex-{}.zip", q.hash);
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response())
        }
        "jsonld" => {
            let body = export::export_jsonld(&state.repo, &commit).await?;
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/ld+json".to_string())],
                body,
            )
                .into_response())
        }
        other => Err(CodexError::invalid_input(format!("unknown export format: {other}"))),
    }
}

