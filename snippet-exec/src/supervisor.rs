use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::io;
use std::time::Duration;
use tokio::time;
use tracing::{debug, warn};

use crate::{error::Error, launcher::ProcessHandle};

/// Which side of the deadline race finished first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NormalExit(std::process::ExitStatus),
    TimedOut,
}

/// Wait for the process to exit, killing its process group if `deadline` passes first.
///
/// The leader is only reaped after its group has been signalled, so the group
/// id cannot have been handed to an unrelated process in between. On a normal
/// exit anything left in the group is killed; on a timeout the late exit is
/// still reaped before returning, but the outcome stays `TimedOut`.
pub async fn supervise(
    handle: &mut ProcessHandle,
    deadline: Duration,
    kill_grace: Duration,
) -> Result<Outcome, Error> {
    let pid = handle.pid();
    match time::timeout(deadline, wait_exited(pid)).await {
        Ok(Ok(())) => {
            // helpers left behind in the group
            signal_group(pid, Signal::SIGKILL);
            let status = handle.child.wait().await?;
            debug!("pid {} exited with {}", pid, status);
            Ok(Outcome::NormalExit(status))
        }
        Ok(Err(e)) => {
            warn!("Failed to wait for pid {}: {}", pid, e);
            if let Err(e) = handle.child.kill().await {
                warn!("Failed to kill pid {}: {}", pid, e);
            }
            Err(Error::Io(e))
        }
        Err(_) => {
            warn!("pid {} exceeded the {:?} deadline, terminating", pid, deadline);
            terminate(handle, kill_grace).await;
            Ok(Outcome::TimedOut)
        }
    }
}

/// SIGTERM the group, give it `grace` to exit, then SIGKILL and reap.
///
/// Does nothing but collect the cached status if the leader was already reaped.
pub async fn terminate(handle: &mut ProcessHandle, grace: Duration) {
    let pid = handle.pid();

    if is_unreaped(pid) {
        signal_group(pid, Signal::SIGTERM);
        match time::timeout(grace, wait_exited(pid)).await {
            Ok(Ok(())) => debug!("pid {} exited after SIGTERM", pid),
            Ok(Err(e)) => warn!("Failed to wait for pid {}: {}", pid, e),
            Err(_) => debug!("pid {} outlived the {:?} grace period", pid, grace),
        }
        // exited or not, the leader still holds its pid until reaped below
        signal_group(pid, Signal::SIGKILL);
    }

    match handle.child.wait().await {
        Ok(status) => debug!("pid {} reaped ({}), result discarded", pid, status),
        Err(e) => warn!("Failed to reap pid {}: {}", pid, e),
    }
}

/// Resolve once child `pid` has exited, leaving it a zombie for `Child::wait` to reap
async fn wait_exited(pid: u32) -> io::Result<()> {
    tokio::task::spawn_blocking(move || peek_exit(pid, 0))
        .await
        .map_err(io::Error::other)?
}

/// True while `pid` is still our child, running or exited but not yet reaped
fn is_unreaped(pid: u32) -> bool {
    peek_exit(pid, libc::WNOHANG).is_ok()
}

/// `waitid` with `WNOWAIT`: observes the exit without consuming it
fn peek_exit(pid: u32, flags: libc::c_int) -> io::Result<()> {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let ret = unsafe {
            libc::waitid(
                libc::P_PID,
                pid as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT | flags,
            )
        };
        if ret == 0 {
            return Ok(());
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// Send `signal` to the process group led by `pid`.
///
/// Returns false when the group is already gone; that is not an error.
pub(crate) fn signal_group(pid: u32, signal: Signal) -> bool {
    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) => {
            debug!("Sent {} to process group {}", signal, pid);
            true
        }
        // EPERM shows up on some platforms when only a zombie leader remains
        Err(Errno::ESRCH) | Err(Errno::EPERM) => false,
        Err(e) => {
            warn!("Failed to send {} to process group {}: {}", signal, pid, e);
            false
        }
    }
}
