//! Core data types: commits, object sidecar metadata, plugin catalog rows,
//! and publish jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::canonical::to_canonical_bytes;
use crate::errors::CodexError;
use crate::hash::ObjectHash;

/// A commit record: a manifest of object hashes plus parent pointers and
/// free-text metadata. `hash` is computed over the rest of the fields with
/// itself zeroed — see [`Commit::compute_hash`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub parents: Vec<String>,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub objects: Vec<String>,
}

impl Commit {
    /// Build a new, unhashed commit. `objects` is normalized to sorted,
    /// deduplicated order per the manifest invariant.
    pub fn new(
        parents: Vec<String>,
        author: impl Into<String>,
        message: impl Into<String>,
        mut objects: Vec<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        objects.sort();
        objects.dedup();
        let mut commit = Commit {
            hash: String::new(),
            parents,
            author: author.into(),
            timestamp,
            message: message.into(),
            objects,
        };
        commit.hash = commit.compute_hash().expect("commit always encodes to json");
        commit
    }

    /// SHA-256 hex digest over the canonical JSON encoding of this commit
    /// with `hash` set to the empty string, per the determinism invariant.
    pub fn compute_hash(&self) -> Result<String, CodexError> {
        let mut zeroed = self.clone();
        zeroed.hash = String::new();
        let bytes = to_canonical_bytes(&zeroed)?;
        Ok(ObjectHash::of(&bytes).as_hex())
    }

    /// Re-derive the hash and compare against the stored one; used by
    /// integrity checks and by `GetCommit` to validate decoded payloads.
    pub fn verify_hash(&self) -> Result<bool, CodexError> {
        Ok(self.compute_hash()? == self.hash)
    }
}

/// Sidecar metadata stored alongside an object, keyed by the same hash.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    pub filename: Option<String>,
}

impl ObjectMeta {
    pub fn new(content_type: impl Into<String>) -> Self {
        ObjectMeta {
            content_type: content_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(content_type: impl Into<String>, filename: impl Into<String>) -> Self {
        ObjectMeta {
            content_type: content_type.into(),
            filename: Some(filename.into()),
        }
    }
}

/// A row in the plugin host's persisted enablement catalog.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PluginRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub manifest_json: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PluginRecord {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, manifest_json: impl Into<String>) -> Self {
        let now = Utc::now();
        PluginRecord {
            id: Uuid::new_v4(),
            name: name.into(),
            slug: slug.into(),
            manifest_json: manifest_json.into(),
            enabled: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Publishing,
    Success,
    Failed,
}

/// A publish job: one asynchronous attempt to push a version to a channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublishJob {
    pub id: Uuid,
    pub node_id: String,
    pub version_id: String,
    pub channel_id: String,
    /// Carried alongside `channel_id` so the engine can dispatch without a
    /// lookup round-trip.
    pub channel_type: String,
    pub status: JobStatus,
    pub progress: u8,
    pub result_json: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PublishJob {
    pub fn new(node_id: impl Into<String>, version_id: impl Into<String>, channel_id: impl Into<String>, channel_type: impl Into<String>) -> Self {
        PublishJob {
            id: Uuid::new_v4(),
            node_id: node_id.into(),
            version_id: version_id.into(),
            channel_id: channel_id.into(),
            channel_type: channel_type.into(),
            status: JobStatus::Queued,
            progress: 0,
            result_json: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Extract the `urn` field from a JSON object payload, if present at the top
/// level. Non-JSON or URN-less payloads return `None` and are merged by hash
/// union only.
pub fn extract_urn(payload: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    value.get("urn")?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn hash_is_deterministic_over_logical_content() {
        let a = Commit::new(vec![], "alice", "init", vec!["bb".into(), "aa".into()], ts());
        let b = Commit::new(vec![], "alice", "init", vec!["aa".into(), "bb".into()], ts());
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.objects, vec!["aa".to_string(), "bb".to_string()]);
    }

    #[test]
    fn verify_hash_detects_tampering() {
        let mut c = Commit::new(vec![], "alice", "init", vec![], ts());
        assert!(c.verify_hash().unwrap());
        c.message = "tampered".into();
        assert!(!c.verify_hash().unwrap());
    }

    #[test]
    fn extract_urn_reads_top_level_field() {
        let payload = br#"{"urn":"urn:node:1","title":"v1"}"#;
        assert_eq!(extract_urn(payload), Some("urn:node:1".to_string()));
        assert_eq!(extract_urn(b"not json"), None);
        assert_eq!(extract_urn(br#"{"title":"no urn"}"#), None);
    }
}
