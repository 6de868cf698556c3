use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::debug;

use crate::{config::SandboxConfig, error::Error, workspace::Workspace};

/// A spawned, sandboxed interpreter together with its output pipes
#[derive(Debug)]
pub struct ProcessHandle {
    pub(crate) child: Child,
    pid: u32,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    /// Process id, which is also the id of the child's process group
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Hand both pipes to the collector; `None` once taken
    pub(crate) fn take_pipes(&mut self) -> Option<(ChildStdout, ChildStderr)> {
        match (self.stdout.take(), self.stderr.take()) {
            (Some(stdout), Some(stderr)) => Some((stdout, stderr)),
            _ => None,
        }
    }
}

/// Spawn `interpreter` on the workspace's source file under the sandbox profile,
/// inside the workspace directory
pub fn launch(config: &SandboxConfig, workspace: &Workspace) -> Result<ProcessHandle, Error> {
    let sandbox_tool = resolve_program(&config.sandbox_tool)?;
    let interpreter = resolve_program(&config.interpreter)?;
    if !config.profile.is_file() {
        return Err(Error::Launch(format!(
            "Sandbox profile not found: {}",
            config.profile.display()
        )));
    }

    let work_dir = workspace.dir();

    debug!("Launch - Sandbox: {:?}", sandbox_tool);
    debug!("Launch - Profile: {:?}", config.profile);
    debug!("Launch - Interpreter: {:?} {:?}", interpreter, config.interpreter_args);
    debug!("Launch - Workspace: {:?}", workspace.path());

    let mut command = Command::new(&sandbox_tool);
    command
        .arg("-f")
        .arg(&config.profile)
        .arg(&interpreter)
        .args(&config.interpreter_args)
        .arg(workspace.path())
        .env_clear()
        .env("PATH", "/usr/bin:/bin:/usr/sbin:/sbin")
        .env("HOME", work_dir)
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // New session: no controlling terminal, and the child leads its own
    // process group so the whole tree can be signalled at once.
    unsafe {
        command.pre_exec(|| {
            nix::unistd::setsid()?;
            Ok(())
        });
    }

    let mut child = command
        .spawn()
        .map_err(|e| Error::Launch(format!("Failed to spawn {}: {}", sandbox_tool.display(), e)))?;

    let pid = child
        .id()
        .ok_or_else(|| Error::Launch("Spawned process has no pid".to_string()))?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    debug!("Launched pid {}", pid);
    Ok(ProcessHandle {
        child,
        pid,
        stdout,
        stderr,
    })
}

/// Absolute paths must exist; bare names are looked up on PATH
fn resolve_program(program: &Path) -> Result<PathBuf, Error> {
    if program.components().count() > 1 {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        return Err(Error::Launch(format!(
            "Program not found: {}",
            program.display()
        )));
    }

    which::which(program)
        .map_err(|_| Error::Launch(format!("Command not found: {}", program.display())))
}
