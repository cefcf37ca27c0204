//! Child registry and SIGINT/SIGTERM handling
//!
//! Every external tool is registered in [`crate::CHILD_PIDS`] from the moment
//! it is spawned until it has been reaped. On an interrupt the handler thread
//! forwards SIGTERM to each registered child and then exits the whole process.
//!
//! The registry lock is held across `spawn` and across the final reap, so the
//! handler never sees a live child missing from the list, and never signals a
//! pid that has already been released to the kernel for reuse.

use crate::CHILD_PIDS;
use crate::exceptions::Result;
use crate::exit_codes::EXIT_INTERRUPTED;
use log::{debug, warn};
use std::io;
use std::process::{Child, Command, ExitStatus};
use std::sync::{MutexGuard, PoisonError};

fn lock_pids() -> MutexGuard<'static, Vec<u32>> {
    CHILD_PIDS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Record a running child
pub fn register_child(pid: u32) {
    lock_pids().push(pid);
}

/// Forget a child once it has been reaped
pub fn unregister_child(pid: u32) {
    lock_pids().retain(|&p| p != pid);
}

/// Spawn `command` and register the child in one step
///
/// # Errors
///
/// Returns the spawn error; nothing is registered in that case.
pub fn spawn_registered(command: &mut Command) -> io::Result<Child> {
    let mut pids = lock_pids();
    let child = command.spawn()?;
    pids.push(child.id());
    Ok(child)
}

/// Wait for a registered child and unregister it
///
/// The child is first waited on without being reaped. Only then is it reaped
/// with the registry locked, so its pid leaves the list at the same moment it
/// stops belonging to us.
///
/// # Errors
///
/// Returns the error from waiting on the child.
pub fn reap_child(child: &mut Child) -> io::Result<ExitStatus> {
    let pid = child.id();
    if let Err(e) = wait_exited(pid) {
        debug!("⚠️ Could not wait on child {pid} without reaping it: {e}");
        let status = child.wait();
        unregister_child(pid);
        return status;
    }

    let mut pids = lock_pids();
    let status = child.wait();
    pids.retain(|&p| p != pid);
    status
}

/// Block until `pid` has exited, leaving it waitable
#[cfg(unix)]
#[allow(unsafe_code)]
fn wait_exited(pid: u32) -> io::Result<()> {
    let id: libc::id_t = pid;
    loop {
        // SAFETY: siginfo_t is plain old data, so all-zero is a valid value
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        // SAFETY: `info` is a valid, exclusively borrowed siginfo_t for the call
        let rc = unsafe {
            libc::waitid(libc::P_PID, id, &mut info, libc::WEXITED | libc::WNOWAIT)
        };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

#[cfg(not(unix))]
fn wait_exited(_pid: u32) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "waiting without reaping is not supported on this platform",
    ))
}

/// Whether `pid` is still registered as running
pub fn is_registered(pid: u32) -> bool {
    lock_pids().contains(&pid)
}

/// Send SIGTERM to every registered child, returning how many were signalled
#[cfg(unix)]
pub fn terminate_children() -> usize {
    // Held while signalling so no child is reaped out from under us
    let pids = lock_pids();
    terminate(&pids)
}

/// Send SIGTERM to each pid in `pids`
#[cfg(unix)]
pub fn terminate(pids: &[u32]) -> usize {
    let mut signalled = 0;
    for &pid in pids {
        let Ok(raw_pid) = libc::pid_t::try_from(pid) else {
            continue;
        };
        if send_sigterm(raw_pid) {
            debug!("🛑 Sent SIGTERM to child {pid}");
            signalled += 1;
        } else {
            debug!("⚠️ Child {pid} already gone");
        }
    }
    signalled
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn send_sigterm(pid: libc::pid_t) -> bool {
    // SAFETY: kill(2) takes plain integers and has no memory-safety preconditions
    unsafe { libc::kill(pid, libc::SIGTERM) == 0 }
}

/// Install the interrupt handler thread
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be registered or the
/// handler thread cannot be started.
#[cfg(unix)]
pub fn install_interrupt_handler() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("whisper-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                warn!("⚠️ Received signal {signal}, stopping external tools");
                let stopped = terminate_children();
                if stopped > 0 {
                    warn!("🛑 Terminated {stopped} running tool(s)");
                }
                eprintln!("Received keyboard interrupt.");
                std::process::exit(EXIT_INTERRUPTED);
            }
        })?;

    debug!("🔔 Interrupt handler installed");
    Ok(())
}

/// Signals are left at their defaults where signal-hook has no iterator support
#[cfg(not(unix))]
pub fn install_interrupt_handler() -> Result<()> {
    debug!("⚠️ Interrupt handling not supported on this platform");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_unregister() {
        // Pids far above pid_max so nothing real is ever touched
        let pid = 4_000_000_001;
        register_child(pid);
        assert!(is_registered(pid));
        unregister_child(pid);
        assert!(!is_registered(pid));
    }

    #[cfg(unix)]
    #[test]
    fn test_terminate_stops_running_child() {
        let mut child = spawn_registered(Command::new("sleep").arg("30")).unwrap();

        assert_eq!(terminate(&[child.id()]), 1);
        let status = reap_child(&mut child).unwrap();

        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(libc::SIGTERM));
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_child_stays_registered_until_reaped() {
        let mut child = spawn_registered(&mut Command::new("true")).unwrap();
        let pid = child.id();
        assert!(is_registered(pid));

        // The child exits almost at once but remains a zombie we still own
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(is_registered(pid));

        let status = reap_child(&mut child).unwrap();
        assert!(status.success());
        assert!(!is_registered(pid));
    }
}
