//! `ipfs` plugin: decentralized publication target. `gateway_url` defaults
//! to the local daemon; `Execute` supports the `publish` action the job
//! engine dispatches for an `ipfs` channel.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;
use crate::plugin::plugins::{optional_str, require_str};
use crate::plugin::Plugin;

const DEFAULT_GATEWAY: &str = "http://localhost:5001";

#[derive(Clone)]
struct IpfsConfig {
    gateway_url: String,
    pin_service: Option<String>,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        IpfsConfig {
            gateway_url: DEFAULT_GATEWAY.to_string(),
            pin_service: None,
        }
    }
}

pub struct IpfsPlugin {
    name: String,
    config: RwLock<IpfsConfig>,
}

impl IpfsPlugin {
    pub fn new(name: &str) -> Self {
        IpfsPlugin {
            name: name.to_string(),
            config: RwLock::new(IpfsConfig::default()),
        }
    }
}

#[async_trait]
impl Plugin for IpfsPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), CodexError> {
        let mut state = self.config.write().await;
        if let Some(url) = optional_str(config, "gateway_url") {
            state.gateway_url = url;
        }
        state.pin_service = optional_str(config, "pin_service");
        Ok(())
    }

    async fn validate(&self) -> Result<(), CodexError> {
        Ok(())
    }

    async fn execute(&self, _cancel: CancellationToken, action: &str, payload: Value) -> Result<Value, CodexError> {
        match action {
            "publish" => {
                let content_hash = require_str(&payload, "content_hash")?;
                let state = self.config.read().await;
                Ok(json!({
                    "published": true,
                    "gateway": state.gateway_url,
                    "pin_service": state.pin_service,
                    "cid": content_hash,
                }))
            }
            other => Err(CodexError::invalid_input(format!("unknown ipfs action: {other}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CodexError> {
        Ok(())
    }
}
