//! Credential vault (C6): a key-value store for plugin secrets. Plugins
//! read on demand during `execute`; writes go only through the admin API.
//! No encryption at rest in this revision — the vault is an isolation
//! boundary, not a cryptographic one.

use std::path::PathBuf;

use dashmap::DashMap;
use tokio::fs;

use crate::canonical::to_canonical_bytes;
use crate::errors::CodexError;

pub struct CredentialVault {
    entries: DashMap<String, String>,
    persist_path: PathBuf,
}

impl CredentialVault {
    pub fn new(persist_path: impl Into<PathBuf>) -> Self {
        CredentialVault {
            entries: DashMap::new(),
            persist_path: persist_path.into(),
        }
    }

    pub async fn load(persist_path: impl Into<PathBuf>) -> Result<Self, CodexError> {
        let path = persist_path.into();
        let entries = DashMap::new();
        if fs::try_exists(&path).await? {
            let bytes = fs::read(&path).await?;
            let map: std::collections::BTreeMap<String, String> = serde_json::from_slice(&bytes)
                .map_err(|e| CodexError::MalformedData(format!("credentials: {e}")))?;
            for (k, v) in map {
                entries.insert(k, v);
            }
        }
        Ok(CredentialVault {
            entries,
            persist_path: path,
        })
    }

    pub fn store(&self, key: impl Into<String>, value: impl Into<String>) -> StoreGuard<'_> {
        self.entries.insert(key.into(), value.into());
        StoreGuard { vault: self }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.clone())
    }

    async fn persist(&self) -> Result<(), CodexError> {
        if let Some(parent) = self.persist_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let snapshot: std::collections::BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let bytes = to_canonical_bytes(&snapshot)?;
        fs::write(&self.persist_path, bytes).await?;
        Ok(())
    }
}

/// Returned by [`CredentialVault::store`] so callers can `.await` the
/// persistence step without the vault's synchronous API forcing async
/// everywhere it's read from inside a plugin's hot path.
pub struct StoreGuard<'a> {
    vault: &'a CredentialVault,
}

impl StoreGuard<'_> {
    pub async fn persist(self) -> Result<(), CodexError> {
        self.vault.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = CredentialVault::new(dir.path().join("credentials.json"));
        vault.store("api_key", "secret").persist().await.unwrap();
        assert_eq!(vault.get("api_key"), Some("secret".to_string()));
        assert_eq!(vault.get("missing"), None);
    }

    #[tokio::test]
    async fn load_restores_persisted_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        {
            let vault = CredentialVault::new(&path);
            vault.store("token", "abc").persist().await.unwrap();
        }
        let reloaded = CredentialVault::load(&path).await.unwrap();
        assert_eq!(reloaded.get("token"), Some("abc".to_string()));
    }
}
