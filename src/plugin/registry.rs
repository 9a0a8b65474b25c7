//! Process-wide plugin registry: register/unregister serialized against
//! dispatch lookups, with a timeout-bounded `execute`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::CodexError;
use crate::plugin::Plugin;

/// A shared, mutable name -> instance map. Registration and unregistration
/// take the write lock; dispatch lookups take the read lock, so an
/// in-flight `execute` on a plugin being unregistered completes, but
/// subsequent lookups see `NotRegistered`.
pub struct PluginRegistry {
    plugins: RwLock<HashMap<String, Arc<dyn Plugin>>>,
    dispatch_timeout: Duration,
}

impl PluginRegistry {
    pub fn new(dispatch_timeout: Duration) -> Self {
        PluginRegistry {
            plugins: RwLock::new(HashMap::new()),
            dispatch_timeout,
        }
    }

    /// Rejects a duplicate name.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> Result<(), CodexError> {
        let mut plugins = self.plugins.write().await;
        let name = plugin.name().to_string();
        if plugins.contains_key(&name) {
            return Err(CodexError::invalid_input(format!(
                "plugin {name} already registered"
            )));
        }
        info!(plugin = %name, "registering plugin");
        plugins.insert(name, plugin);
        Ok(())
    }

    /// Removes the plugin and calls its `shutdown`.
    pub async fn unregister(&self, name: &str) -> Result<(), CodexError> {
        let plugin = {
            let mut plugins = self.plugins.write().await;
            plugins.remove(name)
        };
        match plugin {
            Some(plugin) => {
                info!(plugin = %name, "unregistering plugin");
                plugin.shutdown().await
            }
            None => Err(CodexError::NotRegistered(name.to_string())),
        }
    }

    pub async fn list_names(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        let mut names: Vec<String> = plugins.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn is_registered(&self, name: &str) -> bool {
        self.plugins.read().await.contains_key(name)
    }

    /// Dispatches with the registry's configured timeout enforced via a
    /// `CancellationToken`; a timed-out call surfaces as `Timeout` and
    /// cancels the token so the plugin can unwind external work.
    pub async fn execute(&self, name: &str, action: &str, payload: Value) -> Result<Value, CodexError> {
        let plugin = {
            let plugins = self.plugins.read().await;
            plugins.get(name).cloned()
        }
        .ok_or_else(|| CodexError::NotRegistered(name.to_string()))?;

        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        let result = tokio::time::timeout(
            self.dispatch_timeout,
            plugin.execute(cancel.clone(), action, payload),
        )
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => {
                guard.cancel();
                warn!(plugin = %name, action = %action, "plugin dispatch timed out");
                Err(CodexError::Timeout(format!("plugin {name} action {action}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct SlowPlugin {
        shutdown_called: AtomicBool,
    }

    #[async_trait]
    impl Plugin for SlowPlugin {
        fn name(&self) -> &str {
            "slow"
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
        async fn execute(&self, _cancel: CancellationToken, _action: &str, _payload: Value) -> Result<Value, CodexError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Value::Null)
        }
        async fn shutdown(&self) -> Result<(), CodexError> {
            self.shutdown_called.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn register_rejects_duplicate_names() {
        let registry = PluginRegistry::new(Duration::from_secs(1));
        let plugin = Arc::new(SlowPlugin { shutdown_called: AtomicBool::new(false) });
        registry.register(plugin.clone()).await.unwrap();
        let err = registry.register(plugin).await.unwrap_err();
        assert!(matches!(err, CodexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn execute_times_out() {
        let registry = PluginRegistry::new(Duration::from_millis(5));
        let plugin = Arc::new(SlowPlugin { shutdown_called: AtomicBool::new(false) });
        registry.register(plugin).await.unwrap();
        let err = registry.execute("slow", "noop", Value::Null).await.unwrap_err();
        assert!(matches!(err, CodexError::Timeout(_)));
    }

    #[tokio::test]
    async fn unregister_calls_shutdown_and_future_lookups_not_registered() {
        let registry = PluginRegistry::new(Duration::from_secs(1));
        let plugin = Arc::new(SlowPlugin { shutdown_called: AtomicBool::new(false) });
        registry.register(plugin.clone()).await.unwrap();
        registry.unregister("slow").await.unwrap();
        assert!(plugin.shutdown_called.load(Ordering::SeqCst));
        let err = registry.execute("slow", "noop", Value::Null).await.unwrap_err();
        assert!(matches!(err, CodexError::NotRegistered(_)));
    }
}
