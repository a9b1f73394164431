//! Persisted list of paths that failed a comparison

use std::path::Path;

use serde::{Deserialize, Serialize};
use shasync_fs::{NormalizedPath, RobustnessConfig, io};

use crate::{Error, Result};

/// JSON array of manifest keys, consumed by a later targeted re-check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MismatchLog {
    paths: Vec<String>,
}

impl MismatchLog {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Load a mismatch log. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Self> {
        match io::read_text_if_exists(&NormalizedPath::new(path))? {
            Some(content) => serde_json::from_str(&content).map_err(|e| {
                Error::config(format!("mismatch log {} is not a JSON array: {e}", path.display()))
            }),
            None => Ok(Self::default()),
        }
    }

    /// Atomically replace the log at `path`.
    pub fn save(&self, path: &Path, robustness: RobustnessConfig) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        io::write_text(&NormalizedPath::new(path), &content, robustness)?;
        Ok(())
    }
}

impl FromIterator<String> for MismatchLog {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mismatches.json");
        MismatchLog::new(vec!["/b.txt".into()])
            .save(&path, RobustnessConfig::default())
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!(["/b.txt"]));
        assert_eq!(MismatchLog::load(&path).unwrap().paths(), ["/b.txt"]);
    }

    #[test]
    fn missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MismatchLog::load(&dir.path().join("none.json")).unwrap().is_empty());
    }

    #[test]
    fn object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mismatches.json");
        std::fs::write(&path, "{\"/a\": \"1\"}").unwrap();
        assert!(matches!(MismatchLog::load(&path), Err(Error::Config { .. })));
    }
}
