//! Pipeline services: batch dispatch, per-batch merge work, and commit

pub mod committer;
pub mod dispatcher;
pub mod merge_worker;

pub use committer::ResultCommitter;
pub use dispatcher::{BatchDispatcher, DispatchConfig, RunReport};
pub use merge_worker::MergeWorker;
