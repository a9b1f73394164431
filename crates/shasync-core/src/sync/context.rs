//! Per-root resume state

use crate::manifest::{Manifest, ManifestEntry, Recovered};

/// What is already synchronized for one root.
///
/// Built from the recovered manifest at the start of a root and threaded
/// through the engine; nothing about progress lives in ambient state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncContext {
    done: Manifest,
    resume_point: Option<ManifestEntry>,
}

impl SyncContext {
    pub fn new(done: Manifest) -> Self {
        let resume_point = done.last();
        Self { done, resume_point }
    }

    pub fn from_recovered(recovered: &Recovered) -> Self {
        Self::new(recovered.manifest.clone())
    }

    /// Last entry recorded before this run started.
    pub fn resume_point(&self) -> Option<&ManifestEntry> {
        self.resume_point.as_ref()
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.done.contains(key)
    }

    /// Mark an entry as recorded. Returns `false` if it already was.
    pub fn record(&mut self, entry: ManifestEntry) -> bool {
        if self.done.contains(&entry.path) {
            return false;
        }
        self.done.insert(entry);
        true
    }

    /// Everything recorded so far, prior runs first.
    pub fn manifest(&self) -> &Manifest {
        &self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_point_is_last_recovered_entry() {
        let done: Manifest = [("/a/1", "aa"), ("/a/2", "bb")].into_iter().collect();
        let ctx = SyncContext::new(done);
        assert_eq!(ctx.resume_point().unwrap().path, "/a/2");
        assert!(ctx.is_done("/a/1"));
        assert!(!ctx.is_done("/a/3"));
    }

    #[test]
    fn record_is_idempotent() {
        let mut ctx = SyncContext::default();
        assert!(ctx.record(ManifestEntry::new("/a", "1")));
        assert!(!ctx.record(ManifestEntry::new("/a", "1")));
        assert_eq!(ctx.manifest().len(), 1);
        assert_eq!(ctx.resume_point(), None);
    }
}
