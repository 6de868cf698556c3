//! # Snippet Execution
//!
//! Runs a source snippet through an external interpreter wrapped in an OS
//! sandbox profile, bounded by a wall-clock deadline. Each request gets its
//! own private directory, source file and process; output is captured from both pipes
//! and error lines are classified into diagnostics.

mod collector;
mod config;
mod diagnostics;
mod error;
mod executor;
mod launcher;
mod service;
mod supervisor;
mod types;
mod workspace;

#[cfg(test)]
mod tests;

pub use config::{SandboxConfig, DEFAULT_TIMEOUT};
pub use diagnostics::classify;
pub use error::Error;
pub use executor::SnippetExecutor;
pub use service::EvalService;
pub use types::{DiagnosticKind, DiagnosticMessage, ExecutionRequest, ExecutionResult, ExitStatus};
pub use workspace::{Workspace, WorkspaceManager};

/// Result type for snippet execution operations
pub type Result<T> = std::result::Result<T, Error>;
