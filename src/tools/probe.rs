//! Parse `unsquashfs -s` superblock output
//!
//! The output is free text meant for humans, so only the two lines we need are
//! read and both are validated before being handed to `mksquashfs`.

use crate::exceptions::{Result, WhisperError};

/// Squashfs build parameters recovered from an existing partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashfsParams {
    /// Compressor name as accepted by `mksquashfs -comp`
    pub compression: String,
    /// Block size in bytes as accepted by `mksquashfs -b`
    pub block_size: u32,
}

const COMPRESSION_PREFIX: &str = "Compression ";
const BLOCK_SIZE_PREFIX: &str = "Block size ";

/// Extract compression and block size from `unsquashfs -s` output
///
/// Only top-level lines count: indented lines describe compressor options
/// (e.g. `\tcompression-level 9`) and are skipped.
///
/// # Errors
///
/// Returns `UnrecognizedToolOutput` if either line is missing or malformed.
pub fn parse_squashfs_params(output: &str) -> Result<SquashfsParams> {
    let mut compression = None;
    let mut block_size = None;

    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let line = line.trim_end();

        if compression.is_none() {
            if let Some(value) = line.strip_prefix(COMPRESSION_PREFIX) {
                compression = Some(parse_codec(value)?);
                continue;
            }
        }
        if block_size.is_none() {
            if let Some(value) = line.strip_prefix(BLOCK_SIZE_PREFIX) {
                block_size = Some(parse_block_size(value)?);
            }
        }
    }

    match (compression, block_size) {
        (Some(compression), Some(block_size)) => Ok(SquashfsParams {
            compression,
            block_size,
        }),
        (None, _) => Err(WhisperError::UnrecognizedToolOutput(
            "no 'Compression <codec>' line in unsquashfs output".to_string(),
        )),
        (_, None) => Err(WhisperError::UnrecognizedToolOutput(
            "no 'Block size <n>' line in unsquashfs output".to_string(),
        )),
    }
}

fn parse_codec(value: &str) -> Result<String> {
    let codec = value.trim();
    let valid = !codec.is_empty()
        && codec
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(WhisperError::UnrecognizedToolOutput(format!(
            "unexpected compression value '{codec}'"
        )));
    }
    Ok(codec.to_string())
}

fn parse_block_size(value: &str) -> Result<u32> {
    let value = value.trim();
    match value.parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(WhisperError::UnrecognizedToolOutput(format!(
            "unexpected block size value '{value}'"
        ))),
    }
}
