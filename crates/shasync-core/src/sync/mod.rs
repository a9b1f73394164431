//! Resumable push of a work directory to the remote host

mod context;
mod engine;

pub use context::SyncContext;
pub use engine::{FileState, RootReport, SyncEngine, SyncReport};
