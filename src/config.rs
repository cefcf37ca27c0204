//! Run configuration
//!
//! A `Config` is built once by the binary and handed to every entry point in
//! [`crate::api`]; nothing in the library reads command-line state directly.

use crate::exceptions::{Result, WhisperError};
use crate::firmware::defaults::{
    DEFAULT_JEFFERSON, DEFAULT_MAKE_TARGET, DEFAULT_MKSQUASHFS, DEFAULT_RM, DEFAULT_UNSQUASHFS,
    JEFFERSON_ENV, MKSQUASHFS_ENV, RM_ENV, UNSQUASHFS_ENV,
};
use crate::utils::env_or;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What a single invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Rebuild the image from partition files, then remove the raw files
    Pack,
    /// Split the image and extract every filesystem partition
    Unpack,
    /// Recompose one squashfs partition from its edited extraction directory
    Make,
    /// Remove partition files and extraction directories
    Cleanup,
}

impl Mode {
    /// Whether this mode reads or writes the `--binary` image
    pub fn needs_binary(self) -> bool {
        matches!(self, Mode::Pack | Mode::Unpack)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Pack => "pack",
            Mode::Unpack => "unpack",
            Mode::Make => "make",
            Mode::Cleanup => "cleanup",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = WhisperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pack" => Ok(Mode::Pack),
            "unpack" => Ok(Mode::Unpack),
            "make" => Ok(Mode::Make),
            "cleanup" => Ok(Mode::Cleanup),
            other => Err(WhisperError::Configuration(format!(
                "Unknown mode '{other}' (expected pack, unpack, make or cleanup)"
            ))),
        }
    }
}

/// What to do when an external tool in a batch fails
///
/// Neither policy stops other tools in the batch from being launched or
/// awaited; the policy only decides the batch's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the run once the batch has finished
    #[default]
    Abort,
    /// Log the failure and carry on
    Continue,
}

impl FromStr for FailurePolicy {
    type Err = WhisperError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(FailurePolicy::Abort),
            "continue" => Ok(FailurePolicy::Continue),
            other => Err(WhisperError::Configuration(format!(
                "Unknown tool failure policy '{other}' (expected abort or continue)"
            ))),
        }
    }
}

/// Executables used for the external steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub unsquashfs: String,
    pub mksquashfs: String,
    pub jefferson: String,
    pub rm: String,
}

impl ToolPaths {
    /// Tool names from `WHISPER_*` environment overrides, else the defaults
    pub fn from_env() -> Self {
        Self {
            unsquashfs: env_or(UNSQUASHFS_ENV, DEFAULT_UNSQUASHFS),
            mksquashfs: env_or(MKSQUASHFS_ENV, DEFAULT_MKSQUASHFS),
            jefferson: env_or(JEFFERSON_ENV, DEFAULT_JEFFERSON),
            rm: env_or(RM_ENV, DEFAULT_RM),
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            unsquashfs: DEFAULT_UNSQUASHFS.to_string(),
            mksquashfs: DEFAULT_MKSQUASHFS.to_string(),
            jefferson: DEFAULT_JEFFERSON.to_string(),
            rm: DEFAULT_RM.to_string(),
        }
    }
}

/// Everything one invocation needs
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    /// Source image for unpack, destination image for pack
    pub binary: Option<PathBuf>,
    /// Directory holding partition files and extraction directories
    pub workdir: PathBuf,
    pub on_tool_failure: FailurePolicy,
    /// Squashfs partition rebuilt by `make`
    pub make_target: String,
    pub tools: ToolPaths,
}

impl Config {
    /// Create a config for `mode` with defaults for everything else
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            binary: None,
            workdir: PathBuf::from("."),
            on_tool_failure: FailurePolicy::default(),
            make_target: DEFAULT_MAKE_TARGET.to_string(),
            tools: ToolPaths::default(),
        }
    }

    pub fn with_binary<P: Into<PathBuf>>(mut self, binary: P) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn with_workdir<P: Into<PathBuf>>(mut self, workdir: P) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolPaths) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_tool_failure = policy;
        self
    }

    /// The binary path, or a configuration error if this mode needs one
    pub fn require_binary(&self) -> Result<&Path> {
        self.binary.as_deref().ok_or_else(|| {
            WhisperError::Configuration(format!("Unspecified binary to {}", self.mode))
        })
    }

    /// Reject configurations that cannot run, before any I/O happens
    pub fn validate(&self) -> Result<()> {
        if self.mode.needs_binary() {
            self.require_binary()?;
        }
        Ok(())
    }
}
