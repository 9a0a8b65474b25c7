//! Content hashing for codex objects and commits.
//!
//! Every object and commit is addressed by the SHA-256 digest of its bytes,
//! encoded as a 64-character lowercase hex string. Unlike the multi-algorithm
//! selector this crate's storage layer once supported, the codex format is
//! fixed to a single algorithm, so `ObjectHash` carries no kind tag.

use std::fmt::Display;
use std::io;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Byte length of a SHA-256 digest.
pub const HASH_SIZE: usize = 32;
/// Length of the hex-encoded digest.
pub const HASH_HEX_LEN: usize = 64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
/// A SHA-256 content hash, the identity of an object or commit.
pub struct ObjectHash([u8; HASH_SIZE]);

impl std::fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectHash({})", self)
    }
}

impl Display for ObjectHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl AsRef<[u8]> for ObjectHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for ObjectHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_HEX_LEN {
            return Err(format!(
                "invalid hash length: got {}, expected {HASH_HEX_LEN}",
                s.len()
            ));
        }
        let bytes = hex::decode(s).map_err(|e| e.to_string())?;
        let mut h = [0u8; HASH_SIZE];
        h.copy_from_slice(&bytes);
        Ok(ObjectHash(h))
    }
}

impl ObjectHash {
    /// Digest of `data`.
    pub fn of(data: &[u8]) -> ObjectHash {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(digest.as_ref());
        ObjectHash(bytes)
    }

    /// Wrap a raw 32-byte digest already computed elsewhere (e.g. a streaming hasher).
    pub fn from_bytes(bytes: &[u8]) -> Result<ObjectHash, String> {
        if bytes.len() != HASH_SIZE {
            return Err(format!(
                "invalid byte length: got {}, expected {HASH_SIZE}",
                bytes.len()
            ));
        }
        let mut h = [0u8; HASH_SIZE];
        h.copy_from_slice(bytes);
        Ok(ObjectHash(h))
    }

    /// Read a hash from a stream in its raw binary form.
    pub fn from_stream(data: &mut impl io::Read) -> io::Result<ObjectHash> {
        let mut h = [0u8; HASH_SIZE];
        data.read_exact(&mut h)?;
        Ok(ObjectHash(h))
    }

    /// Raw digest bytes.
    pub fn to_data(self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Incremental SHA-256 hasher, used by the object store while streaming a
/// write so the whole payload never needs to sit in memory.
pub struct StreamingHasher {
    inner: Sha256,
}

impl Default for StreamingHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingHasher {
    pub fn new() -> Self {
        StreamingHasher { inner: Sha256::new() }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    pub fn finalize(self) -> ObjectHash {
        let digest = self.inner.finalize();
        let mut bytes = [0u8; HASH_SIZE];
        bytes.copy_from_slice(digest.as_ref());
        ObjectHash(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        let h = ObjectHash::of(b"abc");
        assert_eq!(
            h.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn from_str_round_trips() {
        let h = ObjectHash::of(b"Hello, world!");
        let parsed: ObjectHash = h.to_string().parse().unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("deadbeef".parse::<ObjectHash>().is_err());
    }

    #[test]
    fn streaming_hasher_matches_one_shot() {
        let mut hasher = StreamingHasher::new();
        hasher.update(b"Hello, ");
        hasher.update(b"world!");
        assert_eq!(hasher.finalize(), ObjectHash::of(b"Hello, world!"));
    }

    #[test]
    fn from_stream_reads_raw_bytes() {
        let h = ObjectHash::of(b"abc");
        let mut cursor = std::io::Cursor::new(h.to_data());
        let parsed = ObjectHash::from_stream(&mut cursor).unwrap();
        assert_eq!(h, parsed);
    }
}
