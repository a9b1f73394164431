//! Shared test utilities for the shasync workspace.
//!
//! Dev-dependency only, never published. Pulled in from `tests/` directories;
//! unit tests inside shasync-core cannot use it without a dependency cycle.
//!
//! # Modules
//!
//! - [`tree`] - [`TestTree`] builder for work directories
//! - [`transfer`] - [`ScriptedTransfer`] in-memory remote host
//! - [`checksum`] - checksum doubles

pub mod checksum;
pub mod transfer;
pub mod tree;

pub use checksum::FailingChecksum;
pub use transfer::{Call, ScriptedTransfer};
pub use tree::TestTree;
