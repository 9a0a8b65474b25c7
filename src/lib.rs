//! codex-core is a content-addressed versioned knowledge store: immutable
//! objects, commits with parent DAGs, named refs, three-way merge with
//! URN-based conflict detection, archival export, and a plugin host that
//! mediates every external side-effecting operation.

pub mod canonical;
pub mod cli;
pub mod config;
pub mod errors;
pub mod export;
pub mod hash;
pub mod http;
pub mod jobs;
pub mod model;
pub mod plugin;
pub mod repository;
pub mod store;
