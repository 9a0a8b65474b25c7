//! Concrete plugins for the ten fixed slugs. `instantiate` is the factory
//! table the catalog consults on bootstrap and on enabling a row; unknown
//! slugs never reach it because the catalog rejects them at `create` time.

mod git;
mod ipfs;
mod media;
mod namecheap;
mod stub;

use std::sync::Arc;

use serde_json::Value;

use crate::errors::CodexError;
use crate::plugin::{CredentialVault, Plugin};

pub fn instantiate(slug: &str, name: &str, vault: Arc<CredentialVault>) -> Result<Arc<dyn Plugin>, CodexError> {
    let plugin: Arc<dyn Plugin> = match slug {
        "git" => Arc::new(git::GitPlugin::new(name)),
        "ipfs" => Arc::new(ipfs::IpfsPlugin::new(name)),
        "namecheap" => Arc::new(namecheap::NamecheapPlugin::new(name, vault)),
        "media" => Arc::new(media::MediaPlugin::new(name)),
        "pixospritz" | "shader" | "svg" | "code" | "todo" | "reminder" => {
            Arc::new(stub::StubPlugin::new(name, slug))
        }
        other => return Err(CodexError::invalid_input(format!("unknown plugin slug: {other}"))),
    };
    Ok(plugin)
}

/// Looks up `field` in `payload` as a required string; missing or
/// wrong-shaped fields are `InvalidInput`.
pub(crate) fn require_str(payload: &Value, field: &str) -> Result<String, CodexError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| CodexError::invalid_input(format!("missing required field: {field}")))
}

pub(crate) fn optional_str(config: &std::collections::HashMap<String, Value>, key: &str) -> Option<String> {
    config.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Best-effort PATH search, used by `validate` to check for a required
/// external binary without shelling out.
pub(crate) fn binary_on_path(bin: &str) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| dir.join(bin).is_file()))
        .unwrap_or(false)
}
