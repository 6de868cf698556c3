use std::time::Instant;
use tracing::{debug, warn};

use crate::{
    collector::StreamCollector,
    config::SandboxConfig,
    diagnostics::classify,
    error::Error,
    launcher::launch,
    supervisor::{supervise, terminate, Outcome},
    types::{ExecutionRequest, ExecutionResult},
    workspace::{Workspace, WorkspaceManager},
};

/// Runs one request end to end: workspace, sandboxed launch, deadline race,
/// stream capture, classification, cleanup.
pub struct SnippetExecutor {
    config: SandboxConfig,
    workspaces: WorkspaceManager,
}

impl SnippetExecutor {
    pub fn new(config: SandboxConfig) -> Result<Self, Error> {
        config.validate()?;
        let workspaces = WorkspaceManager::new(&config)?;
        Ok(Self { config, workspaces })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Execute `request`; every failure is reported through the returned result
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
        let workspace = match self.workspaces.acquire(request.source()).await {
            Ok(workspace) => workspace,
            Err(e) => {
                warn!("Could not prepare workspace: {}", e);
                return ExecutionResult::IoFailed {
                    cause: e.to_string(),
                };
            }
        };

        let result = self.run_in_workspace(&workspace, request).await;
        workspace.release();
        result
    }

    async fn run_in_workspace(
        &self,
        workspace: &Workspace,
        request: &ExecutionRequest,
    ) -> ExecutionResult {
        let started = Instant::now();

        let mut handle = match launch(&self.config, workspace) {
            Ok(handle) => handle,
            Err(Error::Launch(cause)) => return ExecutionResult::LaunchFailed { cause },
            Err(e) => {
                return ExecutionResult::LaunchFailed {
                    cause: e.to_string(),
                }
            }
        };

        let Some((stdout, stderr)) = handle.take_pipes() else {
            terminate(&mut handle, self.config.kill_grace).await;
            return ExecutionResult::IoFailed {
                cause: "child output pipes were not captured".to_string(),
            };
        };
        let collector = StreamCollector::start(stdout, stderr, self.config.output_limit);

        match supervise(&mut handle, request.timeout(), self.config.kill_grace).await {
            Ok(Outcome::NormalExit(status)) => {
                // a helper outside the process group may still hold the pipes;
                // the request's deadline covers reading them too
                let remaining = (started + request.timeout())
                    .saturating_duration_since(Instant::now())
                    + self.config.kill_grace;
                let Some((stdout, stderr)) = collector.finish_within(remaining).await else {
                    warn!("Output was not complete by the deadline");
                    return ExecutionResult::TimedOut {
                        timeout: request.timeout(),
                    };
                };
                let diagnostics = if stderr.is_empty() {
                    Vec::new()
                } else {
                    classify(&stderr)
                };
                debug!(
                    "Collected {} stdout bytes, {} stderr bytes, {} diagnostics",
                    stdout.len(),
                    stderr.len(),
                    diagnostics.len()
                );

                ExecutionResult::Completed {
                    stdout,
                    stderr,
                    diagnostics,
                    exit_status: status.into(),
                    elapsed: started.elapsed(),
                }
            }
            Ok(Outcome::TimedOut) => {
                collector.discard();
                ExecutionResult::TimedOut {
                    timeout: request.timeout(),
                }
            }
            Err(e) => {
                collector.discard();
                ExecutionResult::IoFailed {
                    cause: e.to_string(),
                }
            }
        }
    }
}
