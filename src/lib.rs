//! Whisper - split and reassemble fixed-layout camera firmware images
//!
//! This crate slices a flat firmware image into named partition files, drives the
//! external squashfs/jffs2 tools that unpack and repack them, and merges the
//! edited partitions back into a flashable image with every partition padded to
//! its declared footprint.

#![deny(
    // Safety
    unsafe_code,

    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,
)]
#![warn(
    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Code clarity and maintainability
    clippy::cognitive_complexity,
    clippy::too_many_arguments,
    clippy::type_complexity,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]

pub mod api;
pub mod config;
pub mod exceptions;
pub mod exit_codes;
pub mod firmware;
pub mod logger;
pub mod tools;
pub mod utils;
pub mod version;

use std::sync::Mutex;

// Re-export main API functions
pub use api::{MakeReport, cleanup_all, make_filesystem, pack_image, run, unpack_image};
pub use config::{Config, FailurePolicy, Mode, ToolPaths};
pub use exceptions::WhisperError;

// Re-export layout types for advanced usage
pub use firmware::{PartitionDescriptor, get_partitions};
pub use tools::{BatchReport, ToolCommand, run_parallel};

// PIDs of external tools that are still running (used by the interrupt handler)
pub static CHILD_PIDS: Mutex<Vec<u32>> = Mutex::new(Vec::new());
