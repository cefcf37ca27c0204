//! High-level API: one entry point per mode

use crate::config::{Config, Mode};
use crate::exceptions::{Result, WhisperError};
use crate::firmware::defaults::{JFFS2, NO_BANNER_ENV, SQUASHFS_1, SQUASHFS_2};
use crate::firmware::{
    PartitionStat, WorkPaths, cleanup, full_cleanup, get_partitions, merge, split,
};
use crate::tools::{
    BatchReport, SquashfsParams, extraction_commands, parse_squashfs_params, probe_command,
    repack_command, run_captured, run_parallel,
};
use crate::utils::is_env_true;
use log::{debug, info, warn};
use std::fs;

/// What a make run produced
#[derive(Debug, Clone)]
pub struct MakeReport {
    /// Parameters read from the original partition
    pub params: SquashfsParams,
    /// Outcome of the `mksquashfs` run
    pub repack: BatchReport,
}

impl MakeReport {
    pub fn is_success(&self) -> bool {
        self.repack.is_success()
    }
}

/// Run the mode selected in `config`
///
/// # Errors
///
/// Returns a configuration error before any I/O if the mode needs a binary
/// path and none was given; otherwise whatever the selected mode returns.
pub fn run(config: &Config) -> Result<()> {
    config.validate()?;

    if !is_env_true(NO_BANNER_ENV) {
        warn!(
            "[!!!] this tool is for educational purposes only. never use in the wild without explicitly written permission."
        );
    }

    match config.mode {
        Mode::Unpack => unpack_image(config).map(|_| ()),
        Mode::Pack => pack_image(config).map(|_| ()),
        Mode::Make => make_filesystem(config).map(|_| ()),
        Mode::Cleanup => cleanup_all(config).map(|_| ()),
    }
}

/// Split the image into partition files and extract the filesystems
///
/// # Errors
///
/// Returns an error if the image cannot be split, or if an extraction tool
/// fails under the abort policy.
pub fn unpack_image(config: &Config) -> Result<BatchReport> {
    let source = config.require_binary()?;
    let paths = WorkPaths::new(&config.workdir);
    let partitions = get_partitions();

    info!("📦 [UNPACK] Splitting {source:?}");
    split(source, &partitions, &paths)?;

    for name in [SQUASHFS_1, SQUASHFS_2, JFFS2] {
        let out_dir = paths.extract_dir(name);
        if out_dir.exists() {
            warn!("⚠️ {out_dir:?} already exists; run --mode cleanup first if extraction fails");
        }
    }

    let commands = extraction_commands(&config.tools, &paths);

    info!("📦 [UNPACK] Extracting {} filesystems", commands.len());
    let report = run_parallel(&commands, config.on_tool_failure)?;
    info!("📦 [UNPACK] Operation complete");
    Ok(report)
}

/// Rebuild the image from the partition files, then remove them
///
/// # Errors
///
/// Returns an error if a partition is missing or too large, or if the image
/// or the partition files cannot be written or removed.
pub fn pack_image(config: &Config) -> Result<Vec<PartitionStat>> {
    let dest = config.require_binary()?;
    let paths = WorkPaths::new(&config.workdir);
    let partitions = get_partitions();

    info!("🧩 [PACK] Building {dest:?}");
    let stats = merge(dest, &partitions, &paths)?;
    for stat in &stats {
        debug!(
            "  {}: {} bytes + {:#x} padding",
            stat.name, stat.bytes, stat.padding
        );
    }

    cleanup(&partitions, &paths)?;
    info!("🧩 [PACK] Operation complete");
    Ok(stats)
}

/// Recompose a squashfs partition from its edited extraction directory
///
/// Compression and block size are read from the original partition so the
/// rebuilt filesystem matches what the firmware expects.
///
/// # Errors
///
/// Returns an error if the target is not a squashfs partition, the probe
/// fails or prints something unexpected, or `mksquashfs` fails under the abort
/// policy. Under the continue policy a failed `mksquashfs` is reported in the
/// returned [`MakeReport`] instead.
pub fn make_filesystem(config: &Config) -> Result<MakeReport> {
    let target = config.make_target.as_str();
    if target != SQUASHFS_1 && target != SQUASHFS_2 {
        return Err(WhisperError::Configuration(format!(
            "Cannot make '{target}': only {SQUASHFS_1} and {SQUASHFS_2} are squashfs partitions"
        )));
    }
    let paths = WorkPaths::new(&config.workdir);

    info!("🔧 [MAKE] Probing {target}");
    let output = run_captured(&probe_command(&config.tools, &paths, target))?;
    let params = parse_squashfs_params(&output)?;
    info!(
        "🔧 [MAKE] {target}: compression {}, block size {}",
        params.compression, params.block_size
    );

    // mksquashfs appends to an existing image instead of replacing it
    let staging = paths.staging(target);
    if staging.exists() {
        debug!("🗑️ Removing stale {staging:?}");
        fs::remove_file(&staging)?;
    }

    let repack = repack_command(&config.tools, &paths, target, &params);
    let report = run_parallel(std::slice::from_ref(&repack), config.on_tool_failure)?;
    if report.is_success() {
        info!("🔧 [MAKE] Wrote {staging:?}");
    } else {
        warn!("⚠️ [MAKE] mksquashfs failed, {staging:?} is incomplete or missing");
    }
    Ok(MakeReport {
        params,
        repack: report,
    })
}

/// Remove partition files and every extraction directory
///
/// # Errors
///
/// Returns an error if a file cannot be removed, or if a removal tool fails
/// under the abort policy.
pub fn cleanup_all(config: &Config) -> Result<BatchReport> {
    let paths = WorkPaths::new(&config.workdir);
    full_cleanup(
        &get_partitions(),
        &paths,
        &config.tools,
        config.on_tool_failure,
    )
}
