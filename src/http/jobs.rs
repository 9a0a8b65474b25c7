//! Publish job endpoints: enqueue a job against the `JobEngine` and poll its
//! status. Outside §6's core codex/plugin route set, but the only reachable
//! caller of the engine in the shipped binaries.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::errors::CodexError;
use crate::http::AppState;
use crate::model::PublishJob;

#[derive(Deserialize)]
pub struct EnqueueJobBody {
    node_id: String,
    version_id: String,
    channel_id: String,
    channel_type: String,
}

pub async fn enqueue_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueJobBody>,
) -> Result<Response, CodexError> {
    let job = PublishJob::new(body.node_id, body.version_id, body.channel_id, body.channel_type);
    let job = state.jobs.enqueue(job).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"id": job.id, "status": job.status}))).into_response())
}

#[derive(Deserialize)]
pub struct JobQuery {
    id: Uuid,
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Query(q): Query<JobQuery>,
) -> Result<Json<PublishJob>, CodexError> {
    Ok(Json(state.jobs.get(q.id).await?))
}
