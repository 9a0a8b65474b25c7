//! Archival export (C5): a zip-of-files archive bundle and a linked-data
//! JSON form, both reading a commit plus its referenced objects out of the
//! repository.

use std::io::Write;

use base64::Engine;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::canonical::to_canonical_string;
use crate::errors::CodexError;
use crate::model::Commit;
use crate::repository::Repository;

/// Chunk size for streaming an object's bytes into a zip entry or base64
/// encoder without buffering the whole payload in memory.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Serialize)]
struct ExportedObject {
    hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    object: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_base64: Option<String>,
}

#[derive(Serialize)]
struct LinkedDataExport {
    commit: Commit,
    objects: Vec<ExportedObject>,
    exported_at: chrono::DateTime<Utc>,
}

/// Writes the zip archive bundle for `commit` into `writer`: `commit.json`
/// at the root, then `objects/<hash>` and `objects/<hash>.meta.json` for
/// each referenced object, sorted by hash. Objects that fail to read are
/// skipped silently rather than aborting the export.
pub async fn export_zip<W: Write + std::io::Seek>(
    repo: &Repository,
    commit: &Commit,
    writer: W,
) -> Result<W, CodexError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let commit_json = serde_json::to_string_pretty(commit)
        .map_err(|e| CodexError::MalformedData(format!("encoding commit.json: {e}")))?;
    zip.start_file("commit.json", options)
        .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
    zip.write_all(commit_json.as_bytes())
        .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;

    let mut hashes = commit.objects.clone();
    hashes.sort();

    for hash in hashes {
        let (mut reader, _) = match repo.objects.get_object_stream(&hash).await {
            Ok(r) => r,
            Err(_) => continue,
        };
        zip.start_file(format!("objects/{hash}"), options)
            .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
        let mut buf = [0u8; COPY_CHUNK_SIZE];
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(|e| CodexError::StorageError(format!("reading object {hash}: {e}")))?;
            if n == 0 {
                break;
            }
            zip.write_all(&buf[..n])
                .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
        }

        let content_type = repo
            .objects
            .get_meta(&hash)
            .await?
            .map(|m| m.content_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let meta_json = to_canonical_string(&serde_json::json!({"content_type": content_type}))?;
        zip.start_file(format!("objects/{hash}.meta.json"), options)
            .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
        zip.write_all(meta_json.as_bytes())
            .map_err(|e| CodexError::StorageError(format!("zip: {e}")))?;
    }

    zip.finish()
        .map_err(|e| CodexError::StorageError(format!("zip: {e}")))
}

/// Builds the linked-data JSON document: each object is inlined as decoded
/// JSON when its content-type indicates JSON and the payload parses, or
/// base64-encoded otherwise.
pub async fn export_jsonld(repo: &Repository, commit: &Commit) -> Result<String, CodexError> {
    let mut objects = Vec::with_capacity(commit.objects.len());
    for hash in &commit.objects {
        let (mut reader, _) = match repo.objects.get_object_stream(hash).await {
            Ok(r) => r,
            Err(_) => continue,
        };
        let content_type = repo
            .objects
            .get_meta(hash)
            .await?
            .map(|m| m.content_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let (object, content_base64) = if content_type.contains("json") {
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .await
                .map_err(|e| CodexError::StorageError(format!("reading object {hash}: {e}")))?;
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(v) => (Some(v), None),
                Err(_) => (None, Some(base64::engine::general_purpose::STANDARD.encode(&bytes))),
            }
        } else {
            (None, Some(base64_encode_stream(&mut reader).await?))
        };

        objects.push(ExportedObject {
            hash: hash.clone(),
            object,
            content_base64,
        });
    }

    let doc = LinkedDataExport {
        commit: commit.clone(),
        objects,
        exported_at: Utc::now(),
    };
    serde_json::to_string(&doc).map_err(|e| CodexError::MalformedData(format!("encoding jsonld: {e}")))
}

/// Base64-encodes an object's bytes by copying fixed-size chunks through a
/// `base64::write::EncoderWriter`, never materializing the whole payload.
async fn base64_encode_stream(reader: &mut tokio::fs::File) -> Result<String, CodexError> {
    let mut encoder = base64::write::EncoderWriter::new(Vec::new(), &base64::engine::general_purpose::STANDARD);
    let mut buf = [0u8; COPY_CHUNK_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| CodexError::StorageError(format!("reading object: {e}")))?;
        if n == 0 {
            break;
        }
        encoder
            .write_all(&buf[..n])
            .map_err(|e| CodexError::StorageError(format!("base64 encoding: {e}")))?;
    }
    let bytes = encoder
        .finish()
        .map_err(|e| CodexError::StorageError(format!("base64 encoding: {e}")))?;
    Ok(String::from_utf8(bytes).expect("base64 output is ASCII"))
}
