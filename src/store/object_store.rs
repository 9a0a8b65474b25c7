//! Content-addressed object storage (C1): streaming put/get of immutable
//! byte payloads plus a content-type/filename sidecar keyed by the same hash.

use std::path::PathBuf;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::canonical::to_canonical_bytes;
use crate::errors::CodexError;
use crate::hash::{ObjectHash, StreamingHasher};
use crate::model::ObjectMeta;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Filesystem-backed object store rooted at `<root>/objects`.
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ObjectStore { dir: dir.into() }
    }

    pub async fn ensure_dirs(&self) -> Result<(), CodexError> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        self.dir.join(hash)
    }

    fn meta_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.meta.json"))
    }

    fn tmp_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{}.tmp", uuid::Uuid::new_v4()))
    }

    /// Idempotent write keyed by a caller-precomputed hash. A pre-existing
    /// object with different bytes is an integrity violation, not a retry.
    pub async fn put_object(&self, hash: &ObjectHash, payload: &[u8]) -> Result<(), CodexError> {
        self.ensure_dirs().await?;
        let path = self.object_path(&hash.as_hex());
        if fs::try_exists(&path).await? {
            let existing = fs::read(&path).await?;
            if existing == payload {
                return Ok(());
            }
            return Err(CodexError::IntegrityError(format!(
                "object {hash} already exists with different content"
            )));
        }
        self.write_atomic(&path, payload).await
    }

    /// Consume `reader` to end of stream, hashing incrementally, then commit
    /// the bytes under the computed hash and record the content-type sidecar.
    pub async fn put_object_stream(
        &self,
        reader: impl AsyncRead + Unpin,
        content_type: &str,
    ) -> Result<ObjectHash, CodexError> {
        self.put_object_stream_with_filename(reader, content_type, None)
            .await
    }

    pub async fn put_object_stream_with_filename(
        &self,
        mut reader: impl AsyncRead + Unpin,
        content_type: &str,
        filename: Option<String>,
    ) -> Result<ObjectHash, CodexError> {
        self.ensure_dirs().await?;
        let tmp = self.dir.join(format!("incoming-{}.tmp", uuid::Uuid::new_v4()));
        let mut file = fs::File::create(&tmp).await?;
        let mut hasher = StreamingHasher::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;
        drop(file);
        let hash = hasher.finalize();
        let final_path = self.object_path(&hash.as_hex());
        if fs::try_exists(&final_path).await? {
            fs::remove_file(&tmp).await?;
        } else {
            fs::rename(&tmp, &final_path).await?;
        }
        let meta = match filename {
            Some(f) => ObjectMeta::with_filename(content_type, f),
            None => ObjectMeta::new(content_type),
        };
        self.put_meta(&hash.as_hex(), &meta).await?;
        Ok(hash)
    }

    pub async fn has_object(&self, hash: &str) -> Result<bool, CodexError> {
        Ok(fs::try_exists(self.object_path(hash)).await?)
    }

    pub async fn get_object(&self, hash: &str) -> Result<Vec<u8>, CodexError> {
        let path = self.object_path(hash);
        fs::read(&path)
            .await
            .map_err(|_| CodexError::not_found(format!("object {hash}")))
    }

    /// Returns an open file handle for streaming plus the resolved
    /// content-type, falling back to `application/octet-stream` (or
    /// `application/json` when the payload parses as JSON) when no sidecar
    /// is recorded.
    pub async fn get_object_stream(&self, hash: &str) -> Result<(fs::File, String), CodexError> {
        let path = self.object_path(hash);
        let file = fs::File::open(&path)
            .await
            .map_err(|_| CodexError::not_found(format!("object {hash}")))?;
        let content_type = match self.get_meta(hash).await? {
            Some(meta) => meta.content_type,
            None => {
                let bytes = fs::read(&path).await?;
                if serde_json::from_slice::<serde_json::Value>(&bytes).is_ok() {
                    JSON_CONTENT_TYPE.to_string()
                } else {
                    DEFAULT_CONTENT_TYPE.to_string()
                }
            }
        };
        Ok((file, content_type))
    }

    pub async fn get_meta(&self, hash: &str) -> Result<Option<ObjectMeta>, CodexError> {
        let path = self.meta_path(hash);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let bytes = fs::read(&path).await?;
        let meta = serde_json::from_slice(&bytes)
            .map_err(|e| CodexError::MalformedData(format!("object meta {hash}: {e}")))?;
        Ok(Some(meta))
    }

    pub async fn put_meta(&self, hash: &str, meta: &ObjectMeta) -> Result<(), CodexError> {
        self.ensure_dirs().await?;
        let bytes = to_canonical_bytes(meta)?;
        self.write_atomic(&self.meta_path(hash), &bytes).await
    }

    /// Lexicographically-ordered hashes of stored objects whose hex id
    /// starts with `prefix`. Sidecar `.meta.json` files are not objects and
    /// are excluded.
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, CodexError> {
        self.ensure_dirs().await?;
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".meta.json") || name.ends_with(".tmp") {
                continue;
            }
            if name.starts_with(prefix) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn write_atomic(&self, path: &std::path::Path, bytes: &[u8]) -> Result<(), CodexError> {
        let tmp = self.tmp_path(&path.file_name().unwrap().to_string_lossy());
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}
