//! Rebuild a flashable image from processed partition files
//!
//! The header partition is not part of the rebuilt image: output starts with the
//! kernel. Each partition is zero-padded to its declared size so the fixed
//! offsets of the layout hold no matter how small the recompressed content is.
//!
//! The image is assembled in a temporary file next to the destination and only
//! renamed over it once every partition has been written, so a failed merge
//! leaves any previous image untouched.

use super::PartitionStat;
use super::partitions::{PartitionDescriptor, validate_layout};
use super::paths::WorkPaths;
use crate::exceptions::{Result, WhisperError};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Merge every partition but the first into `dest`
///
/// # Errors
///
/// Returns an error if:
/// - The layout is invalid
/// - A partition file is missing or unreadable
/// - A partition file is larger than its declared size
/// - The destination cannot be written or replaced
pub fn merge(
    dest: &Path,
    partitions: &[PartitionDescriptor],
    paths: &WorkPaths,
) -> Result<Vec<PartitionStat>> {
    validate_layout(partitions)?;

    info!("🧩 Merging {} partitions into {dest:?}", partitions.len().saturating_sub(1));
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staging = NamedTempFile::new_in(dir)?;
    // A replaced image keeps its mode instead of the temp file's 0600
    if let Ok(meta) = fs::metadata(dest) {
        staging.as_file().set_permissions(meta.permissions())?;
    }
    let mut out = BufWriter::new(staging.as_file());
    let mut stats = Vec::with_capacity(partitions.len());

    for part in partitions.iter().skip(1) {
        let data = read_processed_partition(paths, part)?;
        let padding = part.size - data.len() as u64;

        out.write_all(&data)?;
        io::copy(&mut io::repeat(0).take(padding), &mut out)?;

        debug!("Wrote {} - {} bytes", part.name, data.len());
        debug!("Padding: {:#x}", padding);

        stats.push(PartitionStat {
            name: part.name.clone(),
            bytes: data.len() as u64,
            padding,
        });
    }

    out.flush()?;
    drop(out);
    staging.persist(dest).map_err(|e| e.error)?;
    info!("✅ Padding operation success");
    Ok(stats)
}

/// Read a processed partition file, refusing anything past its declared size
fn read_processed_partition(paths: &WorkPaths, part: &PartitionDescriptor) -> Result<Vec<u8>> {
    let path = paths.partition(part);
    let file = File::open(&path).map_err(|e| {
        io::Error::new(e.kind(), format!("partition '{}' ({:?}): {e}", part.name, path))
    })?;
    let file_len = file.metadata().map(|m| m.len()).ok();

    // One byte past the limit is enough to detect an oversized file
    let mut data = Vec::new();
    file.take(part.size + 1).read_to_end(&mut data)?;

    if data.len() as u64 > part.size {
        return Err(WhisperError::PartitionTooLarge {
            partition: part.name.clone(),
            size: part.size,
            actual: file_len.unwrap_or(data.len() as u64),
        });
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::defaults::IMAGE_SIZE;
    use crate::firmware::{get_partitions, split};
    use std::fs;
    use tempfile::TempDir;

    fn small_layout() -> Vec<PartitionDescriptor> {
        vec![
            PartitionDescriptor::new("hdr", 0x0, 0x4),
            PartitionDescriptor::new("kernel", 0x4, 0x10),
            PartitionDescriptor::new("rootfs", 0x14, 0x20),
        ]
    }

    #[test]
    fn test_round_trip_reproduces_image_after_header() {
        let temp = TempDir::new().unwrap();
        let mut image: Vec<u8> = (0..IMAGE_SIZE).map(|i| (i % 251) as u8).collect();
        image[0x200040] = 0x01;
        let source = temp.path().join("orig.bin");
        fs::write(&source, &image).unwrap();

        let paths = WorkPaths::new(temp.path());
        split(&source, &get_partitions(), &paths).unwrap();

        let rebuilt = temp.path().join("rebuilt.bin");
        merge(&rebuilt, &get_partitions(), &paths).unwrap();

        let rebuilt = fs::read(rebuilt).unwrap();
        assert_eq!(rebuilt.len() as u64, IMAGE_SIZE - 0x40);
        assert_eq!(&rebuilt[..], &image[0x40..]);
    }

    #[test]
    fn test_short_partition_is_zero_padded() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [0xEEu8; 0x10]).unwrap();
        fs::write(temp.path().join("rootfs"), [0x11u8; 5]).unwrap();

        let dest = temp.path().join("out.bin");
        let stats = merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).unwrap();

        let out = fs::read(&dest).unwrap();
        assert_eq!(out.len(), 0x30);
        assert_eq!(&out[..0x10], &[0xEEu8; 0x10]);
        assert_eq!(&out[0x10..0x15], &[0x11u8; 5]);
        assert!(out[0x15..].iter().all(|&b| b == 0));

        assert_eq!(stats[1].bytes, 5);
        assert_eq!(stats[1].padding, 0x20 - 5);
    }

    #[test]
    fn test_empty_partition_is_all_padding() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), b"").unwrap();
        fs::write(temp.path().join("rootfs"), [0x22u8; 0x20]).unwrap();

        let dest = temp.path().join("out.bin");
        merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).unwrap();

        let out = fs::read(&dest).unwrap();
        assert!(out[..0x10].iter().all(|&b| b == 0));
        assert_eq!(&out[0x10..], &[0x22u8; 0x20]);
    }

    #[test]
    fn test_oversized_partition_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [0xEEu8; 0x10]).unwrap();
        fs::write(temp.path().join("rootfs"), [0x11u8; 0x21]).unwrap();

        let dest = temp.path().join("out.bin");
        let err = merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).unwrap_err();
        match err {
            WhisperError::PartitionTooLarge {
                partition,
                size,
                actual,
            } => {
                assert_eq!(partition, "rootfs");
                assert_eq!(size, 0x20);
                assert_eq!(actual, 0x21);
            }
            other => panic!("unexpected error: {other}"),
        }

    }

    #[test]
    fn test_failed_merge_keeps_previous_image() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [0xEEu8; 0x10]).unwrap();
        fs::write(temp.path().join("rootfs"), [0x11u8; 0x21]).unwrap();
        let dest = temp.path().join("out.bin");
        fs::write(&dest, b"previous image").unwrap();

        assert!(merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).is_err());

        assert_eq!(fs::read(&dest).unwrap(), b"previous image");
        // No staging file is left behind either
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|name| !["kernel", "rootfs", "out.bin"].contains(&name.to_str().unwrap()))
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[test]
    fn test_merge_replaces_existing_image() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [1u8; 0x10]).unwrap();
        fs::write(temp.path().join("rootfs"), [2u8; 0x20]).unwrap();
        let dest = temp.path().join("out.bin");
        fs::write(&dest, vec![0xFFu8; 0x100]).unwrap();

        merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).unwrap();
        assert_eq!(fs::metadata(&dest).unwrap().len(), 0x30);
    }

    #[test]
    fn test_missing_partition_file_names_partition() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [0u8; 4]).unwrap();

        let dest = temp.path().join("out.bin");
        let err = merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).unwrap_err();
        assert!(err.to_string().contains("rootfs"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_header_file_is_not_required() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kernel"), [1u8; 0x10]).unwrap();
        fs::write(temp.path().join("rootfs"), [2u8; 0x20]).unwrap();

        let dest = temp.path().join("out.bin");
        assert!(merge(&dest, &small_layout(), &WorkPaths::new(temp.path())).is_ok());
        assert!(!temp.path().join("hdr").exists());
    }
}
