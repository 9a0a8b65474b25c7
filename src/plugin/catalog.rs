//! Persisted plugin enablement catalog: CRUD over `{id, name, slug,
//! manifest_json, enabled, timestamps}` rows, with toggling `enabled`
//! driving runtime `register`/`unregister` against the live registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::canonical::to_canonical_bytes;
use crate::config::is_known_plugin_slug;
use crate::errors::CodexError;
use crate::model::PluginRecord;
use crate::plugin::plugins::instantiate;
use crate::plugin::{CredentialVault, PluginRegistry};

/// Durable catalog plus the live registry it drives.
pub struct PluginCatalog {
    records: RwLock<HashMap<Uuid, PluginRecord>>,
    persist_path: PathBuf,
    registry: Arc<PluginRegistry>,
    vault: Arc<CredentialVault>,
}

impl PluginCatalog {
    pub async fn load(
        persist_path: impl Into<PathBuf>,
        registry: Arc<PluginRegistry>,
        vault: Arc<CredentialVault>,
    ) -> Result<Self, CodexError> {
        let path = persist_path.into();
        let mut records = HashMap::new();
        if fs::try_exists(&path).await? {
            let bytes = fs::read(&path).await?;
            let rows: Vec<PluginRecord> = serde_json::from_slice(&bytes)
                .map_err(|e| CodexError::MalformedData(format!("plugin catalog: {e}")))?;
            for row in rows {
                records.insert(row.id, row);
            }
        }
        Ok(PluginCatalog {
            records: RwLock::new(records),
            persist_path: path,
            registry,
            vault,
        })
    }

    /// Instantiates and registers every row with `enabled = true`. Unknown
    /// slugs are logged and skipped rather than failing startup.
    pub async fn bootstrap(&self) -> Result<(), CodexError> {
        let rows: Vec<PluginRecord> = {
            let records = self.records.read().await;
            records.values().filter(|r| r.enabled).cloned().collect()
        };
        for row in rows {
            if let Err(e) = self.register_row(&row).await {
                warn!(plugin = %row.name, slug = %row.slug, error = %e, "failed to bootstrap plugin");
            }
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<PluginRecord> {
        let records = self.records.read().await;
        let mut rows: Vec<PluginRecord> = records.values().cloned().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        rows
    }

    pub async fn get(&self, id: Uuid) -> Result<PluginRecord, CodexError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CodexError::not_found(format!("plugin catalog row {id}")))
    }

    pub async fn create(&self, name: String, slug: String, manifest_json: String) -> Result<PluginRecord, CodexError> {
        if !is_known_plugin_slug(&slug) {
            return Err(CodexError::invalid_input(format!("unknown plugin slug: {slug}")));
        }
        let record = PluginRecord::new(name, slug, manifest_json);
        self.records.write().await.insert(record.id, record.clone());
        self.persist().await?;
        Ok(record)
    }

    /// Updates `enabled` and/or `manifest_json`; a rising edge on `enabled`
    /// triggers `register`, a falling edge triggers `unregister`.
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<PluginRecord, CodexError> {
        let mut row = self.get(id).await?;
        let was_enabled = row.enabled;
        row.enabled = enabled;
        row.updated_at = Utc::now();
        self.records.write().await.insert(id, row.clone());
        self.persist().await?;

        if enabled && !was_enabled {
            self.register_row(&row).await?;
        } else if !enabled && was_enabled {
            let _ = self.registry.unregister(&row.name).await;
        }
        Ok(row)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), CodexError> {
        let row = self.records.write().await.remove(&id);
        if let Some(row) = row {
            if row.enabled {
                let _ = self.registry.unregister(&row.name).await;
            }
        }
        self.persist().await
    }

    async fn register_row(&self, row: &PluginRecord) -> Result<(), CodexError> {
        let manifest: HashMap<String, Value> = serde_json::from_str(&row.manifest_json)
            .map_err(|e| CodexError::invalid_input(format!("manifest_json: {e}")))?;
        let plugin = instantiate(&row.slug, &row.name, self.vault.clone())?;
        plugin.initialize(&manifest).await?;
        plugin.validate().await?;
        self.registry.register(plugin).await
    }

    async fn persist(&self) -> Result<(), CodexError> {
        if let Some(parent) = self.persist_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let rows: Vec<PluginRecord> = self.records.read().await.values().cloned().collect();
        let bytes = to_canonical_bytes(&rows)?;
        fs::write(&self.persist_path, bytes).await?;
        Ok(())
    }
}
