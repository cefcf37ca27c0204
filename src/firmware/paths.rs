//! Path management for the work directory holding partition artifacts

use super::defaults::{EXTRACT_DIR_SUFFIX, STAGING_SUFFIX};
use super::partitions::PartitionDescriptor;
use std::path::{Path, PathBuf};

/// Resolves every transient artifact relative to one work directory
#[derive(Debug, Clone)]
pub struct WorkPaths {
    root: PathBuf,
}

impl WorkPaths {
    /// Create a new WorkPaths rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The work directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ==================== Raw partition files ====================

    /// Raw partition file (`<root>/<name>`)
    pub fn partition(&self, part: &PartitionDescriptor) -> PathBuf {
        self.root.join(&part.name)
    }

    // ==================== Derived artifact names ====================
    // External tools run inside the work directory, so their argv uses the
    // bare names below rather than joined paths.

    /// Name of the extraction directory for a partition (`squashfs_1_out`)
    pub fn extract_dir_name(name: &str) -> String {
        format!("{name}{EXTRACT_DIR_SUFFIX}")
    }

    /// Name of the repack staging file for a partition (`squashfs_1_new`)
    pub fn staging_name(name: &str) -> String {
        format!("{name}{STAGING_SUFFIX}")
    }

    /// Full path of the extraction directory
    pub fn extract_dir(&self, name: &str) -> PathBuf {
        self.root.join(Self::extract_dir_name(name))
    }

    /// Full path of the repack staging file
    pub fn staging(&self, name: &str) -> PathBuf {
        self.root.join(Self::staging_name(name))
    }
}

impl Default for WorkPaths {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::WorkPaths;
    use crate::firmware::PartitionDescriptor;
    use std::path::PathBuf;

    #[test]
    fn test_paths_structure() {
        let paths = WorkPaths::new("/tmp/fw");
        let part = PartitionDescriptor::new("squashfs_1", 0x200040, 0x350000);

        assert_eq!(paths.partition(&part), PathBuf::from("/tmp/fw/squashfs_1"));
        assert_eq!(WorkPaths::extract_dir_name("jffs2"), "jffs2_out");
        assert_eq!(WorkPaths::staging_name("squashfs_1"), "squashfs_1_new");
        assert_eq!(
            paths.extract_dir("squashfs_2"),
            PathBuf::from("/tmp/fw/squashfs_2_out")
        );
        assert_eq!(
            paths.staging("squashfs_1"),
            PathBuf::from("/tmp/fw/squashfs_1_new")
        );
    }
}
