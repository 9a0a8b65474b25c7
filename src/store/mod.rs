//! Filesystem-backed storage layer: content-addressed objects (C1), commit
//! records (C2), and named refs (C3).

pub mod commit_store;
pub mod object_store;
pub mod ref_store;

pub use commit_store::CommitStore;
pub use object_store::ObjectStore;
pub use ref_store::RefStore;
