//! Slice a flat firmware image into one file per partition

use super::PartitionStat;
use super::partitions::{PartitionDescriptor, validate_layout};
use super::paths::WorkPaths;
use crate::exceptions::{Result, WhisperError};
use log::{debug, info, trace};
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Split `source` into the partitions of `partitions`
///
/// Every descriptor is written, the header included. A partition the image is
/// too short for fails with `TruncatedRead` before its file is created.
///
/// # Errors
///
/// Returns an error if:
/// - The layout is invalid
/// - The source cannot be opened or is shorter than a partition's end
/// - A partition file cannot be written
pub fn split(
    source: &Path,
    partitions: &[PartitionDescriptor],
    paths: &WorkPaths,
) -> Result<Vec<PartitionStat>> {
    validate_layout(partitions)?;

    let mut image = File::open(source)?;
    let image_len = image.metadata()?.len();
    info!("🔪 Splitting {source:?} ({image_len} bytes) into {} partitions", partitions.len());

    let mut stats = Vec::with_capacity(partitions.len());
    for part in partitions {
        let data = read_partition(&mut image, image_len, part)?;

        let out_path = paths.partition(part);
        fs::write(&out_path, &data)?;
        debug!("Wrote {} - {} bytes", part.name, data.len());
        trace!("  {:?} <- [{:#x}, {:#x})", out_path, part.offset, part.end());

        stats.push(PartitionStat {
            name: part.name.clone(),
            bytes: data.len() as u64,
            padding: 0,
        });
    }

    Ok(stats)
}

/// Read exactly one partition's bytes from the image
fn read_partition(
    image: &mut File,
    image_len: u64,
    part: &PartitionDescriptor,
) -> Result<Vec<u8>> {
    let truncated = |available: u64| WhisperError::TruncatedRead {
        partition: part.name.clone(),
        offset: part.offset,
        expected: part.size,
        available,
    };

    let available = image_len.saturating_sub(part.offset);
    if available < part.size {
        return Err(truncated(available));
    }

    let size = usize::try_from(part.size).map_err(|_| {
        WhisperError::InvalidLayout(format!("'{}' size {:#x} exceeds memory", part.name, part.size))
    })?;

    image.seek(SeekFrom::Start(part.offset))?;
    let mut data = vec![0u8; size];
    // The image may shrink between the length check and the read
    image.read_exact(&mut data).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => truncated(available),
        _ => WhisperError::from(e),
    })?;

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firmware::defaults::IMAGE_SIZE;
    use crate::firmware::get_partitions;
    use tempfile::TempDir;

    fn scenario_image(dir: &Path) -> std::path::PathBuf {
        let mut image = vec![0u8; IMAGE_SIZE as usize];
        image[0x200040] = 0x01;
        image[0x550040] = 0x02;
        let path = dir.join("demo.bin");
        fs::write(&path, &image).unwrap();
        path
    }

    #[test]
    fn test_split_scenario_image() {
        let temp = TempDir::new().unwrap();
        let source = scenario_image(temp.path());
        let paths = WorkPaths::new(temp.path());

        let stats = split(&source, &get_partitions(), &paths).unwrap();

        let sq1 = fs::read(temp.path().join("squashfs_1")).unwrap();
        let sq2 = fs::read(temp.path().join("squashfs_2")).unwrap();
        assert_eq!(sq1[0], 0x01);
        assert_eq!(sq2[0], 0x02);

        let total: u64 = ["uimage_header", "uimage_kernel", "squashfs_1", "squashfs_2", "jffs2"]
            .iter()
            .map(|name| fs::metadata(temp.path().join(name)).unwrap().len())
            .sum();
        assert_eq!(total, IMAGE_SIZE);
        assert_eq!(stats.iter().map(|s| s.bytes).sum::<u64>(), IMAGE_SIZE);
    }

    #[test]
    fn test_split_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let source = scenario_image(temp.path());
        let paths = WorkPaths::new(temp.path());

        split(&source, &get_partitions(), &paths).unwrap();
        let first = fs::read(temp.path().join("squashfs_1")).unwrap();
        let first_kernel = fs::read(temp.path().join("uimage_kernel")).unwrap();

        split(&source, &get_partitions(), &paths).unwrap();
        assert_eq!(fs::read(temp.path().join("squashfs_1")).unwrap(), first);
        assert_eq!(fs::read(temp.path().join("uimage_kernel")).unwrap(), first_kernel);
    }

    #[test]
    fn test_split_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("small.bin");
        fs::write(&source, [7u8; 8]).unwrap();
        fs::write(temp.path().join("head"), vec![0xFFu8; 64]).unwrap();

        let parts = vec![PartitionDescriptor::new("head", 0, 4)];
        split(&source, &parts, &WorkPaths::new(temp.path())).unwrap();

        assert_eq!(fs::read(temp.path().join("head")).unwrap(), vec![7u8; 4]);
    }

    #[test]
    fn test_truncated_source_stops_before_writing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("short.bin");
        // Long enough for header and kernel, ends inside squashfs_1
        fs::write(&source, vec![0xAAu8; 0x200040 + 0x100]).unwrap();

        let err = split(&source, &get_partitions(), &WorkPaths::new(temp.path())).unwrap_err();
        match err {
            WhisperError::TruncatedRead {
                partition,
                available,
                ..
            } => {
                assert_eq!(partition, "squashfs_1");
                assert_eq!(available, 0x100);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(temp.path().join("uimage_kernel").exists());
        assert!(!temp.path().join("squashfs_1").exists());
        assert!(!temp.path().join("squashfs_2").exists());
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = split(
            &temp.path().join("nope.bin"),
            &get_partitions(),
            &WorkPaths::new(temp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, WhisperError::IoError(_)));
    }
}
