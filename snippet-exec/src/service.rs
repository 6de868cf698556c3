use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    config::SandboxConfig,
    error::Error,
    executor::SnippetExecutor,
    types::{ExecutionRequest, ExecutionResult},
};

#[derive(Clone)]
pub struct EvalService {
    executor: Arc<SnippetExecutor>,
    semaphore: Arc<Semaphore>,
}

impl EvalService {
    pub fn new(config: SandboxConfig) -> Result<Self, Error> {
        let max_concurrent = config.max_concurrent;
        let executor = SnippetExecutor::new(config)?;

        Ok(Self {
            executor: Arc::new(executor),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        self.executor.config()
    }

    pub async fn execute(&self, request: ExecutionRequest) -> Result<ExecutionResult, Error> {
        // Acquire execution permit
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::System(format!("Failed to acquire execution permit: {}", e)))?;

        let span = info_span!("execution", id = %Uuid::new_v4());
        let result = self.executor.execute(&request).instrument(span.clone()).await;

        let _entered = span.enter();
        match &result {
            ExecutionResult::Completed {
                exit_status,
                elapsed,
                ..
            } => info!("Execution completed in {:?} with {:?}", elapsed, exit_status),
            ExecutionResult::TimedOut { timeout } => {
                warn!("Execution did not finish within {:?}", timeout)
            }
            ExecutionResult::LaunchFailed { cause } => error!("Launch failed: {}", cause),
            ExecutionResult::IoFailed { cause } => error!("Execution failed: {}", cause),
        }

        Ok(result)
    }

    /// Execute `source` with the configured default timeout
    pub async fn execute_source(&self, source: &str) -> Result<ExecutionResult, Error> {
        let request = ExecutionRequest::with_default_timeout(source, self.config())?;
        self.execute(request).await
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
