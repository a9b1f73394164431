//! Filesystem layer for shasync
//!
//! Provides manifest key normalization, SHA-256 checksums and the durable
//! write primitives (atomic replace, fsync'd append) the manifest store is
//! built on.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;

pub use checksum::{ChecksumProvider, Sha256Checksum};
pub use config::ConfigStore;
pub use constants::StateFile;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{NormalizedPath, key_to_native, manifest_key, remote_join};
