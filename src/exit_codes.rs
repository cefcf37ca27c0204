//! Standard exit codes for the whisper binary
//!
//! Codes above 100 follow the same numbering scheme for every failure class so
//! wrapper scripts can tell a layout mismatch from a missing tool.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Configuration error (missing --binary, unknown partition)
pub const EXIT_CONFIG_ERROR: i32 = 109;

/// Image layout error (truncated source, oversized partition, bad table)
pub const EXIT_LAYOUT_ERROR: i32 = 111;

/// External tool failed to launch or exited non-zero
pub const EXIT_TOOL_ERROR: i32 = 112;

/// External tool output could not be parsed
pub const EXIT_TOOL_OUTPUT_ERROR: i32 = 113;

/// Cancelled by SIGINT/SIGTERM (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;
