//! Remove transient partition files and extraction directories

use super::partitions::PartitionDescriptor;
use super::paths::WorkPaths;
use crate::config::{FailurePolicy, ToolPaths};
use crate::exceptions::Result;
use crate::tools::{BatchReport, removal_commands, run_parallel};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;

/// Remove the raw partition files; files that are already gone are skipped
///
/// Returns the number of files actually removed.
///
/// # Errors
///
/// Returns an error if an existing file cannot be removed.
pub fn cleanup(partitions: &[PartitionDescriptor], paths: &WorkPaths) -> Result<usize> {
    info!("🧹 Removing junk binaries");
    let mut removed = 0;

    for part in partitions {
        let path = paths.partition(part);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("🗑️ Removed {}", part.name);
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("⏭️ {} not present, skipping", part.name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("🧹 Removed {removed} partition file(s)");
    Ok(removed)
}

/// Remove partition files, then the extraction directories in parallel
///
/// # Errors
///
/// Returns an error if a partition file cannot be removed, or if a removal
/// tool fails under [`FailurePolicy::Abort`].
pub fn full_cleanup(
    partitions: &[PartitionDescriptor],
    paths: &WorkPaths,
    tools: &ToolPaths,
    policy: FailurePolicy,
) -> Result<BatchReport> {
    info!("🧹 Total cleanup starting");
    cleanup(partitions, paths)?;

    let report = run_parallel(&removal_commands(tools, paths), policy)?;
    info!("✅ Total cleanup completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::get_partitions;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_with_missing_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("uimage_header"), [0u8; 0x40]).unwrap();
        fs::write(temp.path().join("jffs2"), [0u8; 16]).unwrap();
        fs::write(temp.path().join("unrelated.txt"), "keep").unwrap();

        let removed = cleanup(&get_partitions(), &WorkPaths::new(temp.path())).unwrap();

        assert_eq!(removed, 2);
        assert!(!temp.path().join("uimage_header").exists());
        assert!(!temp.path().join("jffs2").exists());
        assert!(temp.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let paths = WorkPaths::new(temp.path());
        assert_eq!(cleanup(&get_partitions(), &paths).unwrap(), 0);
        assert_eq!(cleanup(&get_partitions(), &paths).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_full_cleanup_removes_extraction_dirs() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("squashfs_1_out/etc")).unwrap();
        fs::write(temp.path().join("squashfs_1_out/etc/passwd"), "root").unwrap();
        fs::create_dir_all(temp.path().join("jffs2_out")).unwrap();
        fs::write(temp.path().join("squashfs_2"), [1u8; 4]).unwrap();

        let report = full_cleanup(
            &get_partitions(),
            &WorkPaths::new(temp.path()),
            &ToolPaths::default(),
            FailurePolicy::Abort,
        )
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.outcomes.len(), 3);
        assert!(!temp.path().join("squashfs_1_out").exists());
        assert!(!temp.path().join("jffs2_out").exists());
        assert!(!temp.path().join("squashfs_2").exists());
    }
}
