//! Minimal conforming plugins for the six slugs whose payload schemas the
//! distilled spec leaves to their own (out-of-scope) productivity layers:
//! `pixospritz`, `shader`, `svg`, `code`, `todo`, `reminder`. Each accepts a
//! small, slug-appropriate action set, validates payload shape, and returns
//! `InvalidInput` for anything else — enough to exercise the registry and
//! catalog machinery without inventing a full feature surface.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;
use crate::plugin::plugins::require_str;
use crate::plugin::Plugin;

fn actions_for(slug: &str) -> &'static [&'static str] {
    match slug {
        "pixospritz" => &["generate"],
        "shader" => &["compile"],
        "svg" => &["render"],
        "code" => &["run"],
        "todo" => &["create", "complete"],
        "reminder" => &["create", "dismiss"],
        _ => &[],
    }
}

pub struct StubPlugin {
    name: String,
    slug: String,
}

impl StubPlugin {
    pub fn new(name: &str, slug: &str) -> Self {
        StubPlugin {
            name: name.to_string(),
            slug: slug.to_string(),
        }
    }
}

#[async_trait]
impl Plugin for StubPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "0.1.0"
    }

    async fn initialize(&self, _config: &HashMap<String, Value>) -> Result<(), CodexError> {
        Ok(())
    }

    async fn validate(&self) -> Result<(), CodexError> {
        Ok(())
    }

    async fn execute(&self, _cancel: CancellationToken, action: &str, payload: Value) -> Result<Value, CodexError> {
        if !actions_for(&self.slug).contains(&action) {
            return Err(CodexError::invalid_input(format!(
                "unsupported action {action} for plugin {}",
                self.slug
            )));
        }
        let subject = require_str(&payload, "subject")?;
        Ok(json!({"slug": self.slug, "action": action, "subject": subject, "accepted": true}))
    }

    async fn shutdown(&self) -> Result<(), CodexError> {
        Ok(())
    }
}
