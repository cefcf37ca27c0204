//! Firmware image layout and the byte-level split/merge/cleanup operations

pub mod cleanup;
pub mod defaults;
pub mod merger;
pub mod partitions;
pub mod paths;
pub mod splitter;

// Re-export main functions
pub use cleanup::{cleanup, full_cleanup};
pub use merger::merge;
pub use splitter::split;

// Re-export types for advanced usage
pub use partitions::{PartitionDescriptor, find_partition, get_partitions, validate_layout};
pub use paths::WorkPaths;

/// Bytes moved for one partition during a split or merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionStat {
    pub name: String,
    /// Real content bytes read or written
    pub bytes: u64,
    /// Zero bytes appended after the content (always 0 for split)
    pub padding: u64,
}
