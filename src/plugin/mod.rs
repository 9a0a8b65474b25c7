//! Plugin Host (C6): capability registry, credential vault, and the
//! persisted enablement catalog that drives runtime registration.

pub mod catalog;
pub mod plugins;
pub mod registry;
pub mod vault;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;

pub use registry::PluginRegistry;
pub use vault::CredentialVault;

/// A capability provider registered with the host and invoked by
/// `(name, action, payload)`. The core validates `name` at dispatch; the
/// plugin validates `action` itself.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique within the process.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// `config` is the manifest's recognized option mapping (see each
    /// plugin's option enumeration). Returns a failure describing a missing
    /// dependency rather than panicking.
    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), CodexError>;

    /// Checks runtime preconditions without performing network calls that
    /// require credentials.
    async fn validate(&self) -> Result<(), CodexError>;

    /// Called possibly concurrently; `cancel` is honored by plugins doing
    /// external work so a dispatch timeout can unwind them.
    async fn execute(
        &self,
        cancel: CancellationToken,
        action: &str,
        payload: Value,
    ) -> Result<Value, CodexError>;

    async fn shutdown(&self) -> Result<(), CodexError>;
}
