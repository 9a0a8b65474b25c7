//! Publish Job Engine (C7): an asynchronous queue for multi-channel
//! publication. Jobs run as detached `tokio::spawn` tasks so `enqueue`
//! returns immediately; each dispatch is wrapped in a 5-minute timeout and
//! failures never propagate to other jobs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::fs;
use tracing::{error, info};
use uuid::Uuid;

use crate::canonical::to_canonical_bytes;
use crate::errors::CodexError;
use crate::model::{JobStatus, PublishJob};
use crate::plugin::PluginRegistry;

/// A channel's dispatch target, resolved by the caller (the "notes/sites"
/// CRUD layer that owns channel configuration lives outside the core).
#[derive(Clone, Debug)]
pub struct ChannelTarget {
    pub channel_type: String,
}

pub struct JobEngine {
    jobs_dir: PathBuf,
    registry: Arc<PluginRegistry>,
    job_timeout: Duration,
}

impl JobEngine {
    pub fn new(jobs_dir: impl Into<PathBuf>, registry: Arc<PluginRegistry>, job_timeout: Duration) -> Arc<Self> {
        Arc::new(JobEngine {
            jobs_dir: jobs_dir.into(),
            registry,
            job_timeout,
        })
    }

    fn job_path(&self, id: Uuid) -> PathBuf {
        self.jobs_dir.join(format!("{id}.json"))
    }

    async fn persist(&self, job: &PublishJob) -> Result<(), CodexError> {
        fs::create_dir_all(&self.jobs_dir).await?;
        let bytes = to_canonical_bytes(job)?;
        fs::write(self.job_path(job.id), bytes).await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<PublishJob, CodexError> {
        let bytes = fs::read(self.job_path(id))
            .await
            .map_err(|_| CodexError::not_found(format!("job {id}")))?;
        serde_json::from_slice(&bytes).map_err(|e| CodexError::MalformedData(format!("job {id}: {e}")))
    }

    /// Persists `job` with `status = queued` and schedules it on the
    /// runtime. Returns the job immediately; the caller polls `get` for
    /// status.
    pub async fn enqueue(self: &Arc<Self>, job: PublishJob) -> Result<PublishJob, CodexError> {
        self.persist(&job).await?;
        let engine = self.clone();
        let id = job.id;
        tokio::spawn(async move {
            if let Err(e) = engine.run(id).await {
                error!(job = %id, error = %e, "publish job failed to run");
            }
        });
        Ok(job)
    }

    async fn run(self: Arc<Self>, id: Uuid) -> Result<(), CodexError> {
        let mut job = self.get(id).await?;
        job.status = JobStatus::Publishing;
        self.persist(&job).await?;
        info!(job = %id, channel_type = %job.channel_type, "publishing job");

        let outcome = tokio::time::timeout(self.job_timeout, self.dispatch(&job)).await;

        match outcome {
            Ok(Ok(result)) => {
                job.status = JobStatus::Success;
                job.progress = 100;
                job.result_json = Some(result);
            }
            Ok(Err(e)) => {
                job.status = JobStatus::Failed;
                job.error = Some(e.to_string());
            }
            Err(_) => {
                job.status = JobStatus::Failed;
                job.error = Some("job timed out".to_string());
            }
        }
        job.completed_at = Some(Utc::now());
        self.persist(&job).await
    }

    /// Dispatches by channel type: `git` commits then pushes, `ipfs`
    /// publishes, `rss`/`static` are in-core materializations not backed by
    /// a plugin.
    async fn dispatch(&self, job: &PublishJob) -> Result<Value, CodexError> {
        match job.channel_type.as_str() {
            "git" => {
                let commit_payload = json!({"message": format!("publish {}", job.version_id)});
                self.registry.execute("git", "commit", commit_payload).await?;
                self.registry.execute("git", "push", Value::Null).await
            }
            "ipfs" => {
                let payload = json!({"content_hash": job.version_id});
                self.registry.execute("ipfs", "publish", payload).await
            }
            "rss" => Ok(json!({"materialized": "rss", "version_id": job.version_id})),
            "static" => Ok(json!({"materialized": "static-html", "version_id": job.version_id})),
            other => Err(CodexError::invalid_input(format!("unknown channel type: {other}"))),
        }
    }
}
