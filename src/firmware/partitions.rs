//! Partition table for the camera firmware image
//!
//! The offsets below are the flash layout itself. They are kept as literals and
//! never derived from one another.

use super::defaults::{
    IMAGE_SIZE, JFFS2, SQUASHFS_1, SQUASHFS_2, UIMAGE_HEADER, UIMAGE_HEADER_SIZE, UIMAGE_KERNEL,
};
use crate::exceptions::{Result, WhisperError};
use log::debug;

/// A named byte range of the firmware image
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionDescriptor {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

impl PartitionDescriptor {
    /// Create a new descriptor
    pub fn new<S: Into<String>>(name: S, offset: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
        }
    }

    /// First byte past the end of this partition
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Build the fixed partition table, in flash order
pub fn get_partitions() -> Vec<PartitionDescriptor> {
    let partitions = vec![
        PartitionDescriptor::new(UIMAGE_HEADER, 0x0, UIMAGE_HEADER_SIZE),
        PartitionDescriptor::new(UIMAGE_KERNEL, 0x40, 0x200000),
        PartitionDescriptor::new(SQUASHFS_1, 0x200040, 0x350000),
        PartitionDescriptor::new(SQUASHFS_2, 0x550040, 0xA0000),
        PartitionDescriptor::new(JFFS2, 0x5F0040, IMAGE_SIZE - 0x5F0040),
    ];

    for part in &partitions {
        debug!("📐 Prepared partition: {part:?}");
    }

    partitions
}

/// Look up a partition by name
pub fn find_partition<'a>(
    partitions: &'a [PartitionDescriptor],
    name: &str,
) -> Option<&'a PartitionDescriptor> {
    partitions.iter().find(|p| p.name == name)
}

/// Check that descriptors are in strictly increasing, non-overlapping order
pub fn validate_layout(partitions: &[PartitionDescriptor]) -> Result<()> {
    for pair in partitions.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.offset < prev.end() || next.offset <= prev.offset {
            return Err(WhisperError::InvalidLayout(format!(
                "'{}' at {:#x} overlaps '{}' ending at {:#x}",
                next.name,
                next.offset,
                prev.name,
                prev.end()
            )));
        }
    }
    Ok(())
}
