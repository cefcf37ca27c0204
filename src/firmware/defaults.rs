// Fixed names and sizes of the camera firmware layout.
// These are the contract with the flashing process and the external tools.

// =================================
// Image layout
// =================================
pub const IMAGE_SIZE: u64 = 11_075_648; // Total flash image size in bytes
pub const UIMAGE_HEADER_SIZE: u64 = 0x40; // Legacy uImage header

// =================================
// Partition file names
// =================================
pub const UIMAGE_HEADER: &str = "uimage_header";
pub const UIMAGE_KERNEL: &str = "uimage_kernel";
pub const SQUASHFS_1: &str = "squashfs_1";
pub const SQUASHFS_2: &str = "squashfs_2";
pub const JFFS2: &str = "jffs2";

// =================================
// Derived artifact suffixes
// =================================
pub const EXTRACT_DIR_SUFFIX: &str = "_out"; // squashfs_1 -> squashfs_1_out
pub const STAGING_SUFFIX: &str = "_new"; // squashfs_1 -> squashfs_1_new

// =================================
// External tools (overridable through the environment)
// =================================
pub const DEFAULT_UNSQUASHFS: &str = "unsquashfs";
pub const DEFAULT_MKSQUASHFS: &str = "mksquashfs";
pub const DEFAULT_JEFFERSON: &str = "jefferson";
pub const DEFAULT_RM: &str = "rm";

pub const UNSQUASHFS_ENV: &str = "WHISPER_UNSQUASHFS";
pub const MKSQUASHFS_ENV: &str = "WHISPER_MKSQUASHFS";
pub const JEFFERSON_ENV: &str = "WHISPER_JEFFERSON";
pub const RM_ENV: &str = "WHISPER_RM";

// Partition rebuilt by `--mode make` when none is given
pub const DEFAULT_MAKE_TARGET: &str = SQUASHFS_1;

// Set to a truthy value to silence the start-up warning
pub const NO_BANNER_ENV: &str = "WHISPER_NO_BANNER";
