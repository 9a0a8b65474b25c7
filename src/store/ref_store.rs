//! Named ref storage (C3): hierarchical pointers (`refs/heads/<name>`,
//! `refs/tags/<name>`) mapped to commit hashes. Last write wins; no
//! compare-and-swap in this revision.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::CodexError;

/// Filesystem-backed ref store rooted at `<root>/refs`.
pub struct RefStore {
    dir: PathBuf,
}

impl RefStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        RefStore { dir: dir.into() }
    }

    fn ref_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), CodexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Blind replace; creates parent directories for nested ref names
    /// (`refs/heads/<name>`) as needed.
    pub async fn put_ref(&self, name: &str, hash: &str) -> Result<(), CodexError> {
        let path = self.ref_path(name);
        self.ensure_parent(&path).await?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, hash).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    pub async fn get_ref(&self, name: &str) -> Result<String, CodexError> {
        let path = self.ref_path(name);
        let bytes = fs::read(&path)
            .await
            .map_err(|_| CodexError::not_found(format!("ref {name}")))?;
        Ok(String::from_utf8_lossy(&bytes).trim().to_string())
    }

    pub async fn delete_ref(&self, name: &str) -> Result<(), CodexError> {
        let path = self.ref_path(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names under `prefix`, returned in lexicographic order, with the ref
    /// store's own root stripped so callers see `refs/heads/main`-style paths.
    pub async fn list_refs(&self, prefix: &str) -> Result<Vec<String>, CodexError> {
        let mut names = Vec::new();
        self.walk(&self.dir, "", &mut names).await?;
        let mut matching: Vec<String> = names
            .into_iter()
            .filter(|n| n.starts_with(prefix))
            .collect();
        matching.sort();
        Ok(matching)
    }

    fn walk<'a>(
        &'a self,
        dir: &'a Path,
        prefix: &'a str,
        out: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), CodexError>> + 'a>> {
        Box::pin(async move {
            if !fs::try_exists(dir).await? {
                return Ok(());
            }
            let mut entries = fs::read_dir(dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".tmp") {
                    continue;
                }
                let joined = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}/{name}")
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    self.walk(&dir.join(&name), &joined, out).await?;
                } else {
                    out.push(joined);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, RefStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RefStore::new(dir.path().join("refs"));
        (dir, store)
    }

    #[tokio::test]
    async fn put_and_get_round_trips() {
        let (_dir, store) = store().await;
        store.put_ref("refs/heads/main", "abc123").await.unwrap();
        assert_eq!(store.get_ref("refs/heads/main").await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (_dir, store) = store().await;
        store.put_ref("refs/heads/main", "abc123").await.unwrap();
        store.put_ref("refs/heads/main", "def456").await.unwrap();
        assert_eq!(store.get_ref("refs/heads/main").await.unwrap(), "def456");
    }

    #[tokio::test]
    async fn list_refs_filters_by_prefix_sorted() {
        let (_dir, store) = store().await;
        store.put_ref("refs/heads/main", "h1").await.unwrap();
        store.put_ref("refs/heads/dev", "h2").await.unwrap();
        store.put_ref("refs/tags/v1", "h3").await.unwrap();
        let branches = store.list_refs("refs/heads/").await.unwrap();
        assert_eq!(branches, vec!["refs/heads/dev".to_string(), "refs/heads/main".to_string()]);
    }

    #[tokio::test]
    async fn delete_ref_is_idempotent() {
        let (_dir, store) = store().await;
        store.put_ref("refs/heads/main", "h1").await.unwrap();
        store.delete_ref("refs/heads/main").await.unwrap();
        store.delete_ref("refs/heads/main").await.unwrap();
        assert!(store.get_ref("refs/heads/main").await.is_err());
    }
}
