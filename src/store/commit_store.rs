//! Commit persistence (C2): commits are stored as canonical JSON under a
//! namespace kept logically separate from general objects so history
//! listings never have to guess at content shape.

use std::path::PathBuf;

use tokio::fs;

use crate::canonical::to_canonical_bytes;
use crate::errors::CodexError;
use crate::model::Commit;

/// Filesystem-backed commit store rooted at `<root>/commits`.
pub struct CommitStore {
    dir: PathBuf,
}

impl CommitStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CommitStore { dir: dir.into() }
    }

    fn commit_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    pub async fn ensure_dirs(&self) -> Result<(), CodexError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub async fn put_commit(&self, commit: &Commit) -> Result<(), CodexError> {
        self.ensure_dirs().await?;
        let path = self.commit_path(&commit.hash);
        let bytes = to_canonical_bytes(commit)?;
        let tmp = self.dir.join(format!("{}.tmp", uuid::Uuid::new_v4()));
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn get_commit(&self, hash: &str) -> Result<Commit, CodexError> {
        let path = self.commit_path(hash);
        let bytes = fs::read(&path)
            .await
            .map_err(|_| CodexError::not_found(format!("commit {hash}")))?;
        let commit: Commit = serde_json::from_slice(&bytes)
            .map_err(|e| CodexError::MalformedData(format!("commit {hash}: {e}")))?;
        if commit.hash.is_empty() {
            return Err(CodexError::MalformedData(format!(
                "commit {hash} missing hash field"
            )));
        }
        Ok(commit)
    }

    pub async fn has_commit(&self, hash: &str) -> Result<bool, CodexError> {
        Ok(fs::try_exists(self.commit_path(hash)).await?)
    }

    /// All commit hashes currently persisted, unordered.
    pub async fn list_all_hashes(&self) -> Result<Vec<String>, CodexError> {
        self.ensure_dirs().await?;
        let mut hashes = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(hash) = name.strip_suffix(".json") {
                hashes.push(hash.to_string());
            }
        }
        Ok(hashes)
    }
}
