//! The Repository (C4): the public surface callers use, composed over the
//! object/commit/ref stores. Commit creation, history, ancestor search,
//! diff, and three-way merge with URN-based conflict detection all live
//! here.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncRead;
use tracing::info;

use crate::config::CodexConfig;
use crate::errors::CodexError;
use crate::hash::ObjectHash;
use crate::model::{extract_urn, Commit};
use crate::store::{CommitStore, ObjectStore, RefStore};

pub struct Repository {
    pub objects: ObjectStore,
    pub commits: CommitStore,
    pub refs: RefStore,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub hash: String,
    /// Decoded JSON payload, when the object parses as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    /// Always empty: content-addressed storage collapses modification into
    /// add+remove.
    pub modified: Vec<DiffEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub urn: String,
    pub base: Option<String>,
    pub ours: Option<String>,
    pub theirs: Option<String>,
}

pub enum MergeOutcome {
    Merged(Commit),
    Conflicts(Vec<Conflict>),
}

impl Repository {
    pub fn new(config: &CodexConfig) -> Self {
        Repository {
            objects: ObjectStore::new(config.objects_dir()),
            commits: CommitStore::new(config.commits_dir()),
            refs: RefStore::new(config.refs_dir()),
        }
    }

    // ---- Object passthroughs -------------------------------------------------

    pub async fn put_object_stream_with_filename(
        &self,
        reader: impl AsyncRead + Unpin,
        content_type: &str,
        filename: Option<String>,
    ) -> Result<ObjectHash, CodexError> {
        self.objects
            .put_object_stream_with_filename(reader, content_type, filename)
            .await
    }

    // ---- Commit creation ------------------------------------------------------

    /// Normalizes `objects`, stamps a wall-clock timestamp, computes the
    /// deterministic hash, and persists. Fails closed on dangling parents or
    /// objects.
    pub async fn create_commit(
        &self,
        parents: Vec<String>,
        author: impl Into<String>,
        message: impl Into<String>,
        objects: Vec<String>,
    ) -> Result<Commit, CodexError> {
        for parent in &parents {
            if !self.commits.has_commit(parent).await? {
                return Err(CodexError::MissingParent(parent.clone()));
            }
        }
        for object in &objects {
            if !self.objects.has_object(object).await? {
                return Err(CodexError::MissingObject(object.clone()));
            }
        }
        let commit = Commit::new(parents, author.into(), message.into(), objects, chrono::Utc::now());
        self.commits.put_commit(&commit).await?;
        info!(hash = %commit.hash, "created commit");
        Ok(commit)
    }

    /// Accepts a caller-supplied, already-hashed commit (the HTTP
    /// `POST /api/codex/commit` path). Rejects self-parenting, hash
    /// mismatches, and dangling closure.
    pub async fn put_commit(&self, commit: Commit) -> Result<Commit, CodexError> {
        if commit.parents.iter().any(|p| p == &commit.hash) {
            return Err(CodexError::invalid_input("commit cannot be its own parent"));
        }
        let expected = commit.compute_hash()?;
        if expected != commit.hash {
            return Err(CodexError::invalid_input(format!(
                "hash mismatch: computed {expected}, got {}",
                commit.hash
            )));
        }
        for parent in &commit.parents {
            if !self.commits.has_commit(parent).await? {
                return Err(CodexError::MissingParent(parent.clone()));
            }
        }
        for object in &commit.objects {
            if !self.objects.has_object(object).await? {
                return Err(CodexError::MissingObject(object.clone()));
            }
        }
        self.commits.put_commit(&commit).await?;
        info!(hash = %commit.hash, "stored caller-supplied commit");
        Ok(commit)
    }

    pub async fn get_commit(&self, hash: &str) -> Result<Commit, CodexError> {
        self.commits.get_commit(hash).await
    }

    /// All commits, newest first by timestamp, tie-broken by hash ascending.
    /// `offset` beyond the total count returns an empty sequence.
    pub async fn list_commits(&self, limit: usize, offset: usize) -> Result<Vec<Commit>, CodexError> {
        let hashes = self.commits.list_all_hashes().await?;
        let mut commits = Vec::with_capacity(hashes.len());
        for hash in hashes {
            commits.push(self.commits.get_commit(&hash).await?);
        }
        commits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.hash.cmp(&b.hash)));
        Ok(commits.into_iter().skip(offset).take(limit).collect())
    }

    // ---- Ancestor search --------------------------------------------------

    /// BFS `a`'s ancestors into a visited set, then BFS `b`'s ancestors,
    /// returning the first hash already visited. Deterministic given the
    /// same storage contents and BFS order.
    pub async fn find_common_ancestor(&self, a: &str, b: &str) -> Result<Option<String>, CodexError> {
        let visited = self.ancestors_of(a).await?;
        if visited.contains(b) {
            return Ok(Some(b.to_string()));
        }
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut seen_b: HashSet<String> = HashSet::new();
        queue.push_back(b.to_string());
        seen_b.insert(b.to_string());
        while let Some(hash) = queue.pop_front() {
            if visited.contains(&hash) {
                return Ok(Some(hash));
            }
            let commit = self.commits.get_commit(&hash).await?;
            for parent in commit.parents {
                if seen_b.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(None)
    }

    async fn ancestors_of(&self, start: &str) -> Result<HashSet<String>, CodexError> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());
        visited.insert(start.to_string());
        while let Some(hash) = queue.pop_front() {
            let commit = self.commits.get_commit(&hash).await?;
            for parent in commit.parents {
                if visited.insert(parent.clone()) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(visited)
    }

    // ---- Diff ---------------------------------------------------------------

    pub async fn diff(&self, from: &str, to: &str) -> Result<DiffResult, CodexError> {
        let from_commit = self.commits.get_commit(from).await?;
        let to_commit = self.commits.get_commit(to).await?;
        let from_set: HashSet<&String> = from_commit.objects.iter().collect();
        let to_set: HashSet<&String> = to_commit.objects.iter().collect();

        let mut added: Vec<&String> = to_set.difference(&from_set).copied().collect();
        let mut removed: Vec<&String> = from_set.difference(&to_set).copied().collect();
        added.sort();
        removed.sort();

        Ok(DiffResult {
            added: self.entries_for(added).await?,
            removed: self.entries_for(removed).await?,
            modified: Vec::new(),
        })
    }

    async fn entries_for(&self, hashes: Vec<&String>) -> Result<Vec<DiffEntry>, CodexError> {
        let mut entries = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let preview = match self.objects.get_object(hash).await {
                Ok(bytes) => serde_json::from_slice(&bytes).ok(),
                Err(_) => None,
            };
            entries.push(DiffEntry {
                hash: hash.clone(),
                preview,
            });
        }
        Ok(entries)
    }

    // ---- Three-way merge ------------------------------------------------------

    /// §4.4: if `base` is absent, substitutes `FindCommonAncestor(ours,
    /// theirs)`, proceeding with an empty base manifest if no ancestor
    /// exists. Returns either a persisted merge commit or a conflict list;
    /// conflicts leave storage untouched.
    pub async fn merge_commits(
        &self,
        base: Option<String>,
        ours: &str,
        theirs: &str,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<MergeOutcome, CodexError> {
        let base_hash = match base {
            Some(b) => Some(b),
            None => self.find_common_ancestor(ours, theirs).await?,
        };

        let base_map = match &base_hash {
            Some(h) => self.urn_map(h).await?,
            None => BTreeMap::new(),
        };
        let ours_map = self.urn_map(ours).await?;
        let theirs_map = self.urn_map(theirs).await?;

        let mut urns: HashSet<&String> = HashSet::new();
        urns.extend(base_map.keys());
        urns.extend(ours_map.keys());
        urns.extend(theirs_map.keys());

        let mut chosen_by_urn: Vec<String> = Vec::new();
        let mut conflicts = Vec::new();

        let mut sorted_urns: Vec<&String> = urns.into_iter().collect();
        sorted_urns.sort();

        for urn in sorted_urns {
            let b = base_map.get(urn);
            let o = ours_map.get(urn);
            let t = theirs_map.get(urn);

            if o.is_some() && o == t {
                chosen_by_urn.push(o.cloned().expect("checked Some above"));
            } else if b.is_some() && b == o && t.is_some() {
                chosen_by_urn.push(t.cloned().expect("checked Some above"));
            } else if b.is_some() && b == t && o.is_some() {
                chosen_by_urn.push(o.cloned().expect("checked Some above"));
            } else if let (Some(ov), None) = (o, t) {
                chosen_by_urn.push(ov.clone());
            } else if let (None, Some(tv)) = (o, t) {
                chosen_by_urn.push(tv.clone());
            } else if let (Some(ov), Some(tv)) = (o, t) {
                conflicts.push(Conflict {
                    urn: urn.clone(),
                    base: b.cloned(),
                    ours: Some(ov.clone()),
                    theirs: Some(tv.clone()),
                });
            }
            // both absent cannot happen: urn came from one of the three maps.
        }

        if !conflicts.is_empty() {
            return Ok(MergeOutcome::Conflicts(conflicts));
        }

        // Non-URN objects: union of hashes across all three commits, minus
        // anything already chosen for a URN.
        let chosen_set: HashSet<&String> = chosen_by_urn.iter().collect();
        let mut manifest: HashSet<String> = chosen_by_urn.iter().cloned().collect();
        for hash in self.non_urn_hashes(&base_hash, ours, theirs).await? {
            if !chosen_set.contains(&hash) {
                manifest.insert(hash);
            }
        }

        let mut objects: Vec<String> = manifest.into_iter().collect();
        objects.sort();

        let commit = Commit::new(
            vec![ours.to_string(), theirs.to_string()],
            author.into(),
            message.into(),
            objects,
            chrono::Utc::now(),
        );
        self.commits.put_commit(&commit).await?;
        info!(hash = %commit.hash, "merged commit");
        Ok(MergeOutcome::Merged(commit))
    }

    /// Decode each object referenced by `hash`'s manifest as JSON and collect
    /// `urn -> objectHash`; objects without a top-level `urn` are omitted.
    async fn urn_map(&self, hash: &str) -> Result<BTreeMap<String, String>, CodexError> {
        let commit = self.commits.get_commit(hash).await?;
        let mut map = BTreeMap::new();
        for object_hash in &commit.objects {
            if let Ok(bytes) = self.objects.get_object(object_hash).await {
                if let Some(urn) = extract_urn(&bytes) {
                    map.insert(urn, object_hash.clone());
                }
            }
        }
        Ok(map)
    }

    async fn non_urn_hashes(
        &self,
        base: &Option<String>,
        ours: &str,
        theirs: &str,
    ) -> Result<HashSet<String>, CodexError> {
        let mut hashes = HashSet::new();
        if let Some(base) = base {
            self.collect_non_urn(base, &mut hashes).await?;
        }
        self.collect_non_urn(ours, &mut hashes).await?;
        self.collect_non_urn(theirs, &mut hashes).await?;
        Ok(hashes)
    }

    async fn collect_non_urn(&self, commit_hash: &str, out: &mut HashSet<String>) -> Result<(), CodexError> {
        let commit = self.commits.get_commit(commit_hash).await?;
        for object_hash in commit.objects {
            let has_urn = match self.objects.get_object(&object_hash).await {
                Ok(bytes) => extract_urn(&bytes).is_some(),
                Err(_) => false,
            };
            if !has_urn {
                out.insert(object_hash);
            }
        }
        Ok(())
    }

    // ---- Branches -------------------------------------------------------------

    pub async fn create_branch(&self, name: &str, target: &str) -> Result<(), CodexError> {
        if !self.commits.has_commit(target).await? {
            return Err(CodexError::MissingParent(target.to_string()));
        }
        self.refs.put_ref(&format!("refs/heads/{name}"), target).await
    }

    pub async fn list_branches(&self) -> Result<Vec<String>, CodexError> {
        let names = self.refs.list_refs("refs/heads/").await?;
        Ok(names
            .into_iter()
            .map(|n| n.trim_start_matches("refs/heads/").to_string())
            .collect())
    }

    pub async fn set_head(&self, branch: &str, hash: &str) -> Result<(), CodexError> {
        self.refs.put_ref(&format!("refs/heads/{branch}"), hash).await
    }

    pub async fn get_head(&self, branch: &str) -> Result<String, CodexError> {
        self.refs.get_ref(&format!("refs/heads/{branch}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let config = CodexConfig::new(dir.path());
        (dir, Repository::new(&config))
    }

    async fn put_json(repo: &Repository, json: &str) -> String {
        repo.objects
            .put_object_stream(std::io::Cursor::new(json.as_bytes().to_vec()), "application/json")
            .await
            .unwrap()
            .as_hex()
    }

    #[tokio::test]
    async fn diff_is_symmetric_under_swap() {
        let (_dir, repo) = repo().await;
        let o1 = put_json(&repo, r#"{"urn":"urn:x:1"}"#).await;
        let o2 = put_json(&repo, r#"{"urn":"urn:x:2"}"#).await;
        let o3 = put_json(&repo, r#"{"urn":"urn:x:3"}"#).await;
        let a = repo.create_commit(vec![], "a", "a", vec![o1.clone(), o2.clone()]).await.unwrap();
        let b = repo.create_commit(vec![], "a", "b", vec![o1.clone(), o3.clone()]).await.unwrap();

        let ab = repo.diff(&a.hash, &b.hash).await.unwrap();
        let ba = repo.diff(&b.hash, &a.hash).await.unwrap();
        assert_eq!(ab.added.iter().map(|e| &e.hash).collect::<Vec<_>>(), vec![&o3]);
        assert_eq!(ab.removed.iter().map(|e| &e.hash).collect::<Vec<_>>(), vec![&o2]);
        assert_eq!(ba.added.iter().map(|e| &e.hash).collect::<Vec<_>>(), vec![&o2]);
        assert_eq!(ba.removed.iter().map(|e| &e.hash).collect::<Vec<_>>(), vec![&o3]);
    }

    #[tokio::test]
    async fn merge_detects_add_add_urn_conflict() {
        let (_dir, repo) = repo().await;
        let o1 = put_json(&repo, r#"{"urn":"urn:node:1","title":"v1"}"#).await;
        let c1 = repo.create_commit(vec![], "a", "base", vec![o1.clone()]).await.unwrap();

        let o1a = put_json(&repo, r#"{"urn":"urn:node:1","title":"v2"}"#).await;
        let c2 = repo.create_commit(vec![c1.hash.clone()], "a", "ours", vec![o1a.clone()]).await.unwrap();

        let o1b = put_json(&repo, r#"{"urn":"urn:node:1","title":"v3"}"#).await;
        let c3 = repo.create_commit(vec![c1.hash.clone()], "a", "theirs", vec![o1b.clone()]).await.unwrap();

        let outcome = repo
            .merge_commits(Some(c1.hash.clone()), &c2.hash, &c3.hash, "a", "merge")
            .await
            .unwrap();
        match outcome {
            MergeOutcome::Conflicts(conflicts) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].urn, "urn:node:1");
                assert_eq!(conflicts[0].ours.as_deref(), Some(o1a.as_str()));
                assert_eq!(conflicts[0].theirs.as_deref(), Some(o1b.as_str()));
            }
            MergeOutcome::Merged(_) => panic!("expected conflicts"),
        }
    }

    #[tokio::test]
    async fn merge_combines_disjoint_additions_cleanly() {
        let (_dir, repo) = repo().await;
        let o1 = put_json(&repo, r#"{"urn":"urn:node:1"}"#).await;
        let c1 = repo.create_commit(vec![], "a", "base", vec![o1.clone()]).await.unwrap();

        let o2 = put_json(&repo, r#"{"urn":"urn:node:2"}"#).await;
        let c4 = repo
            .create_commit(vec![c1.hash.clone()], "a", "ours", vec![o1.clone(), o2.clone()])
            .await
            .unwrap();

        let o3 = put_json(&repo, r#"{"urn":"urn:node:3"}"#).await;
        let c5 = repo
            .create_commit(vec![c1.hash.clone()], "a", "theirs", vec![o1.clone(), o3.clone()])
            .await
            .unwrap();

        let outcome = repo
            .merge_commits(Some(c1.hash.clone()), &c4.hash, &c5.hash, "a", "merge")
            .await
            .unwrap();
        match outcome {
            MergeOutcome::Merged(commit) => {
                let mut expected = vec![o1, o2, o3];
                expected.sort();
                assert_eq!(commit.objects, expected);
                assert_eq!(commit.parents, vec![c4.hash, c5.hash]);
            }
            MergeOutcome::Conflicts(c) => panic!("expected clean merge, got {c:?}"),
        }
    }

    #[tokio::test]
    async fn find_common_ancestor_is_symmetric() {
        let (_dir, repo) = repo().await;
        let root = repo.create_commit(vec![], "a", "root", vec![]).await.unwrap();
        let left = repo.create_commit(vec![root.hash.clone()], "a", "left", vec![]).await.unwrap();
        let right = repo.create_commit(vec![root.hash.clone()], "a", "right", vec![]).await.unwrap();

        let ab = repo.find_common_ancestor(&left.hash, &right.hash).await.unwrap();
        let ba = repo.find_common_ancestor(&right.hash, &left.hash).await.unwrap();
        assert_eq!(ab, Some(root.hash.clone()));
        assert_eq!(ba, Some(root.hash));
    }

    #[tokio::test]
    async fn disjoint_histories_have_no_common_ancestor() {
        let (_dir, repo) = repo().await;
        let a = repo.create_commit(vec![], "a", "a", vec![]).await.unwrap();
        let b = repo.create_commit(vec![], "a", "b", vec![]).await.unwrap();
        assert_eq!(repo.find_common_ancestor(&a.hash, &b.hash).await.unwrap(), None);
    }

    #[tokio::test]
    async fn create_commit_rejects_missing_parent() {
        let (_dir, repo) = repo().await;
        let err = repo
            .create_commit(vec!["deadbeef".to_string()], "a", "msg", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::MissingParent(_)));
    }

    #[tokio::test]
    async fn create_commit_rejects_missing_object() {
        let (_dir, repo) = repo().await;
        let err = repo
            .create_commit(vec![], "a", "msg", vec!["deadbeef".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CodexError::MissingObject(_)));
    }

    #[tokio::test]
    async fn put_commit_rejects_self_parent() {
        let (_dir, repo) = repo().await;
        let mut commit = Commit::new(vec![], "a", "msg", vec![], chrono::Utc::now());
        commit.parents.push(commit.hash.clone());
        let err = repo.put_commit(commit).await.unwrap_err();
        assert!(matches!(err, CodexError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn branch_round_trip() {
        let (_dir, repo) = repo().await;
        let c1 = repo.create_commit(vec![], "a", "root", vec![]).await.unwrap();
        repo.create_branch("main", &c1.hash).await.unwrap();
        assert_eq!(repo.list_branches().await.unwrap(), vec!["main".to_string()]);
        assert_eq!(repo.get_head("main").await.unwrap(), c1.hash);
    }

    #[tokio::test]
    async fn list_commits_orders_newest_first_with_pagination() {
        let (_dir, repo) = repo().await;
        let c1 = repo.create_commit(vec![], "a", "1", vec![]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let c2 = repo.create_commit(vec![c1.hash.clone()], "a", "2", vec![]).await.unwrap();

        let all = repo.list_commits(10, 0).await.unwrap();
        assert_eq!(all[0].hash, c2.hash);
        assert_eq!(all[1].hash, c1.hash);

        let paged = repo.list_commits(1, 1).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].hash, c1.hash);

        let empty = repo.list_commits(10, 100).await.unwrap();
        assert!(empty.is_empty());
    }
}
