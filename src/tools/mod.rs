//! External unpack/pack tools: argv conventions, batch runner, output parsing

pub mod command;
pub mod probe;
pub mod runner;
pub mod signals;

pub use command::{
    ToolCommand, extraction_commands, probe_command, removal_commands, repack_command,
};
pub use probe::{SquashfsParams, parse_squashfs_params};
pub use runner::{BatchReport, ToolOutcome, ToolStatus, run_captured, run_parallel};
pub use signals::install_interrupt_handler;
