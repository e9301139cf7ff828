//! Host list loading.
//!
//! A host list is a plain text file with one hostname or address per
//! line. Lines are trimmed and blank lines dropped; the remaining order
//! is the rollout order. Duplicates are kept as-is.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FleetError, FleetResult};

/// File name used when no host list path is given.
pub const DEFAULT_HOST_LIST: &str = "nodes";

/// Ordered deployment targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostList {
    source: PathBuf,
    hosts: Vec<String>,
}

impl HostList {
    /// Load a host list, failing if the file is missing or has no hosts.
    pub fn load(path: &Path) -> FleetResult<Self> {
        if !path.is_file() {
            return Err(FleetError::HostListMissing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let list = Self::parse(path, &content);
        if list.is_empty() {
            return Err(FleetError::HostListEmpty(path.to_path_buf()));
        }
        debug!(path = %path.display(), hosts = list.len(), "loaded host list");
        Ok(list)
    }

    /// Parse host list content. Never fails; may return an empty list.
    pub fn parse(source: &Path, content: &str) -> Self {
        let hosts = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self {
            source: source.to_path_buf(),
            hosts,
        }
    }

    /// Resolve an optional CLI argument to a host list path.
    pub fn resolve_path(arg: Option<&str>) -> PathBuf {
        match arg.map(str::trim) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => PathBuf::from(DEFAULT_HOST_LIST),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_nodes(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nodes");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn blank_lines_are_skipped_and_order_kept() {
        let (_dir, path) = write_nodes("node-c\n\nnode-a\n   \nnode-b\n");
        let list = HostList::load(&path).unwrap();
        assert_eq!(list.hosts(), &["node-c", "node-a", "node-b"]);
    }

    #[test]
    fn lines_are_trimmed() {
        let list = HostList::parse(Path::new("nodes"), "  10.0.0.1 \r\n\t10.0.0.2\n");
        assert_eq!(list.hosts(), &["10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn duplicates_are_kept() {
        let list = HostList::parse(Path::new("nodes"), "a\nb\na\n");
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = HostList::load(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FleetError::HostListMissing(_)));
    }

    #[test]
    fn whitespace_only_file_is_empty() {
        let (_dir, path) = write_nodes("\n  \n\n");
        let err = HostList::load(&path).unwrap_err();
        assert!(matches!(err, FleetError::HostListEmpty(_)));
    }

    #[test]
    fn resolve_path_defaults_to_nodes() {
        assert_eq!(HostList::resolve_path(None), PathBuf::from("nodes"));
        assert_eq!(HostList::resolve_path(Some("  ")), PathBuf::from("nodes"));
        assert_eq!(
            HostList::resolve_path(Some("/tmp/nodes")),
            PathBuf::from("/tmp/nodes")
        );
    }
}
