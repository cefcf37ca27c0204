//! Run batches of external tools concurrently
//!
//! A batch runs in two phases. Every command is launched first, in order, so a
//! command that fails immediately cannot keep the others from starting. Then one
//! scoped worker per child waits for it to exit. The batch returns only after
//! every launched child has been reaped.

use super::command::ToolCommand;
use super::signals::{reap_child, spawn_registered};
use crate::config::FailurePolicy;
use crate::exceptions::{Result, WhisperError};
use crate::utils::resolve_executable;
use log::{debug, error, info, trace, warn};
use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// How one command in a batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Process exited with this code
    Exited(i32),
    /// Process was killed by a signal
    Signaled(i32),
    /// Process could not be started
    LaunchFailed(String),
    /// Process started but waiting on it failed
    WaitFailed(String),
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolStatus::Exited(code) => write!(f, "exit code {code}"),
            ToolStatus::Signaled(sig) => write!(f, "killed by signal {sig}"),
            ToolStatus::LaunchFailed(msg) => write!(f, "failed to launch: {msg}"),
            ToolStatus::WaitFailed(msg) => write!(f, "failed to wait: {msg}"),
        }
    }
}

/// Result of one command in a batch
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub command: ToolCommand,
    pub status: ToolStatus,
    /// Child pid, if it was launched
    pub pid: Option<u32>,
    pub elapsed: Duration,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status == ToolStatus::Exited(0)
    }

    fn describe(&self) -> String {
        format!("{} ({}): {}", self.command.label, self.command, self.status)
    }
}

/// Outcomes of a whole batch, in launch order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ToolOutcome>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(ToolOutcome::success)
    }

    /// Outcomes that did not exit cleanly
    pub fn failures(&self) -> impl Iterator<Item = &ToolOutcome> {
        self.outcomes.iter().filter(|o| !o.success())
    }

    /// One line per failed command
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures().map(ToolOutcome::describe).collect()
    }
}

/// A command after the launch phase
enum Launched {
    Running(Child, Instant),
    Failed(String),
}

/// Launch every command, wait for all of them, then apply `policy`
///
/// Standard output of each tool is discarded; standard error is inherited.
///
/// # Errors
///
/// With [`FailurePolicy::Abort`], returns `ExternalToolFailure` listing every
/// failed command once the whole batch has finished.
pub fn run_parallel(commands: &[ToolCommand], policy: FailurePolicy) -> Result<BatchReport> {
    debug!("📋 Scheduling {} commands:", commands.len());
    for cmd in commands {
        debug!("  {cmd}");
    }

    // Phase 1: launch everything, in order
    let launched: Vec<(&ToolCommand, Launched)> = commands
        .iter()
        .map(|cmd| (cmd, launch(cmd)))
        .collect();

    // Phase 2: wait for every child, one worker each
    let outcomes = thread::scope(|scope| {
        let workers: Vec<_> = launched
            .into_iter()
            .map(|(cmd, state)| (cmd, scope.spawn(move || await_child(cmd, state))))
            .collect();

        workers
            .into_iter()
            .map(|(cmd, worker)| {
                worker.join().unwrap_or_else(|_| ToolOutcome {
                    command: cmd.clone(),
                    status: ToolStatus::WaitFailed("wait worker panicked".to_string()),
                    pid: None,
                    elapsed: Duration::ZERO,
                })
            })
            .collect::<Vec<_>>()
    });

    let report = BatchReport { outcomes };
    apply_policy(report, policy)
}

/// Spawn and register one tool
fn spawn(cmd: &ToolCommand, stdout: Stdio) -> io::Result<Child> {
    let program = resolve_executable(&cmd.program);
    let mut command = Command::new(&program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(Stdio::inherit());
    if let Some(dir) = &cmd.current_dir {
        command.current_dir(dir);
    }
    spawn_registered(&mut command)
}

fn launch(cmd: &ToolCommand) -> Launched {
    match spawn(cmd, Stdio::null()) {
        Ok(child) => {
            trace!("🚀 Started {} as pid {}", cmd.label, child.id());
            Launched::Running(child, Instant::now())
        }
        Err(e) => {
            error!("❌ Could not start {} for {}: {e}", cmd.program, cmd.label);
            Launched::Failed(e.to_string())
        }
    }
}

fn await_child(cmd: &ToolCommand, state: Launched) -> ToolOutcome {
    let (mut child, started) = match state {
        Launched::Running(child, started) => (child, started),
        Launched::Failed(msg) => {
            return ToolOutcome {
                command: cmd.clone(),
                status: ToolStatus::LaunchFailed(msg),
                pid: None,
                elapsed: Duration::ZERO,
            };
        }
    };

    let pid = child.id();
    let status = match reap_child(&mut child) {
        Ok(status) => exit_status(status),
        Err(e) => ToolStatus::WaitFailed(e.to_string()),
    };

    let elapsed = started.elapsed();
    debug!("🏁 {} finished in {:?}: {}", cmd.label, elapsed, status);
    ToolOutcome {
        command: cmd.clone(),
        status,
        pid: Some(pid),
        elapsed,
    }
}

fn exit_status(status: std::process::ExitStatus) -> ToolStatus {
    if let Some(code) = status.code() {
        return ToolStatus::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return ToolStatus::Signaled(sig);
        }
    }
    ToolStatus::WaitFailed("no exit code".to_string())
}

/// Whether any tool in the batch was stopped by a keyboard interrupt
#[cfg(unix)]
fn interrupted(report: &BatchReport) -> bool {
    report
        .outcomes
        .iter()
        .any(|o| o.status == ToolStatus::Signaled(libc::SIGINT))
}

#[cfg(not(unix))]
fn interrupted(_report: &BatchReport) -> bool {
    false
}

fn apply_policy(report: BatchReport, policy: FailurePolicy) -> Result<BatchReport> {
    // A cancelled run is not a tool failure, whatever the policy
    if interrupted(&report) {
        warn!("⚠️ A tool was interrupted, stopping");
        return Err(WhisperError::Interrupted);
    }

    let failures = report.failure_messages();
    if failures.is_empty() {
        info!("✅ All {} tools completed", report.outcomes.len());
        return Ok(report);
    }

    match policy {
        FailurePolicy::Abort => {
            for failure in &failures {
                error!("❌ {failure}");
            }
            Err(WhisperError::ExternalToolFailure(failures))
        }
        FailurePolicy::Continue => {
            for failure in &failures {
                warn!("⚠️ {failure} (continuing)");
            }
            Ok(report)
        }
    }
}

/// Run one tool to completion and return its standard output
///
/// # Errors
///
/// Returns `ExternalToolFailure` if the tool cannot be started or exits
/// non-zero, and `UnrecognizedToolOutput` if its output is not UTF-8.
pub fn run_captured(cmd: &ToolCommand) -> Result<String> {
    debug!("🏃 Running: {cmd}");
    let mut child = spawn(cmd, Stdio::piped()).map_err(|e| {
        WhisperError::ExternalToolFailure(vec![format!(
            "{} ({cmd}): failed to launch: {e}",
            cmd.label
        )])
    })?;

    let mut stdout = Vec::new();
    let read = match child.stdout.take() {
        Some(mut pipe) => pipe.read_to_end(&mut stdout).map(|_| ()),
        None => Ok(()),
    };
    // Reap even if reading failed so the child never outlives its registration
    let status = reap_child(&mut child);
    read?;

    let status = exit_status(status?);
    if status != ToolStatus::Exited(0) {
        return Err(WhisperError::ExternalToolFailure(vec![format!(
            "{} ({cmd}): {status}",
            cmd.label
        )]));
    }

    String::from_utf8(stdout).map_err(|_| {
        WhisperError::UnrecognizedToolOutput(format!("{} printed non-UTF-8 output", cmd.program))
    })
}
