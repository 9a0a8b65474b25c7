//! Runtime configuration for the codex core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root-level layout and tuning knobs for a codex repository.
///
/// Paths are always resolved relative to `root` at construction time so the
/// rest of the crate can treat them as absolute.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CodexConfig {
    /// Base directory of the codex repository (e.g. `.codex`).
    pub root: PathBuf,
    /// Dispatch timeout for a single plugin `Execute` call, in seconds.
    pub plugin_dispatch_timeout_secs: u64,
    /// Timeout for a single publish job, in seconds.
    pub job_timeout_secs: u64,
}

impl CodexConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CodexConfig {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join("objects")
    }

    pub fn commits_dir(&self) -> PathBuf {
        self.root.join("commits")
    }

    pub fn refs_dir(&self) -> PathBuf {
        self.root.join("refs")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn plugins_catalog_path(&self) -> PathBuf {
        self.root.join("plugins.json")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.root.join("credentials.json")
    }
}

impl Default for CodexConfig {
    fn default() -> Self {
        CodexConfig {
            root: PathBuf::from(".codex"),
            plugin_dispatch_timeout_secs: 30,
            job_timeout_secs: 300,
        }
    }
}

/// Fixed plugin slugs the host's factory table recognizes; any other slug is
/// rejected with a log warning rather than instantiated.
pub const KNOWN_PLUGIN_SLUGS: &[&str] = &[
    "git",
    "ipfs",
    "namecheap",
    "media",
    "pixospritz",
    "shader",
    "svg",
    "code",
    "todo",
    "reminder",
];

pub fn is_known_plugin_slug(slug: &str) -> bool {
    KNOWN_PLUGIN_SLUGS.contains(&slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_dot_codex() {
        let cfg = CodexConfig::default();
        assert_eq!(cfg.objects_dir(), PathBuf::from(".codex/objects"));
        assert_eq!(cfg.commits_dir(), PathBuf::from(".codex/commits"));
        assert_eq!(cfg.refs_dir(), PathBuf::from(".codex/refs"));
    }

    #[test]
    fn known_slugs_match_spec_table() {
        assert!(is_known_plugin_slug("git"));
        assert!(is_known_plugin_slug("reminder"));
        assert!(!is_known_plugin_slug("unknown-plugin"));
    }
}
