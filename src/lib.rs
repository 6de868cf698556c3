use clap::Parser;
use snippet_exec::{DiagnosticKind, ExecutionResult, SandboxConfig};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Exit code reported when the snippet did not finish in time
pub const EXIT_TIMED_OUT: u8 = 124;
/// Exit code reported when the snippet could not be run at all
pub const EXIT_NOT_RUN: u8 = 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("No source code or file path provided")]
    NoSource,
    #[error("Failed to read file at {path}: {source}")]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error(transparent)]
    Exec(#[from] snippet_exec::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run source code under a sandbox profile", long_about = None)]
pub struct Args {
    /// Source code to execute
    pub source: Option<String>,

    /// Path to a file holding the source code to execute
    #[arg(short, long, conflicts_with = "source")]
    pub file: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<f64>,

    /// Interpreter that receives the source file
    #[arg(long)]
    pub interpreter: Option<PathBuf>,

    /// Sandboxing tool wrapping the interpreter
    #[arg(long)]
    pub sandbox_tool: Option<PathBuf>,

    /// Sandbox profile handed to the sandboxing tool
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn sandbox_config(&self) -> Result<SandboxConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                SandboxConfig::load(path)?
            }
            None => SandboxConfig::default(),
        };

        if let Some(secs) = self.timeout {
            config.timeout = Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|t| !t.is_zero())
                .ok_or_else(|| CliError::InvalidTimeout(secs.to_string()))?;
        }
        if let Some(interpreter) = &self.interpreter {
            config.interpreter = interpreter.clone();
        }
        if let Some(tool) = &self.sandbox_tool {
            config.sandbox_tool = tool.clone();
        }
        if let Some(profile) = &self.profile {
            config.profile = profile.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Inline source, or the contents of `--file`
    pub fn load_source(&self) -> Result<String, CliError> {
        match (&self.file, &self.source) {
            (Some(path), _) => {
                std::fs::read_to_string(path).map_err(|source| CliError::ReadSource {
                    path: path.clone(),
                    source,
                })
            }
            (None, Some(source)) => Ok(source.clone()),
            (None, None) => Err(CliError::NoSource),
        }
    }
}

/// Human-readable report of a result
pub fn render(result: &ExecutionResult) -> String {
    let mut out = String::new();
    match result {
        ExecutionResult::Completed {
            stdout,
            diagnostics,
            exit_status,
            ..
        } => {
            if !stdout.is_empty() {
                let _ = writeln!(out, "Execution Output: {}", stdout.trim_end());
            }
            if !diagnostics.is_empty() {
                let _ = writeln!(out, "Compiler Messages:");
                for message in diagnostics {
                    let tag = match message.kind {
                        DiagnosticKind::Error => "error",
                        DiagnosticKind::Warning => "warning",
                    };
                    let _ = writeln!(out, "  [{}] {}", tag, message.text);
                }
            }
            if let Some(signal) = exit_status.signal {
                let _ = writeln!(out, "Process was terminated by signal {}", signal);
            }
        }
        ExecutionResult::TimedOut { timeout } => {
            let _ = writeln!(out, "Execution did not finish within {:?}", timeout);
        }
        ExecutionResult::LaunchFailed { cause } => {
            let _ = writeln!(out, "Could not launch the interpreter: {}", cause);
        }
        ExecutionResult::IoFailed { cause } => {
            let _ = writeln!(out, "Execution failed: {}", cause);
        }
    }
    out
}

/// Process exit code mirroring the outcome
pub fn exit_code(result: &ExecutionResult) -> u8 {
    match result {
        ExecutionResult::Completed { exit_status, .. } => match exit_status.code {
            Some(code) => u8::try_from(code).unwrap_or(1),
            None => 1,
        },
        ExecutionResult::TimedOut { .. } => EXIT_TIMED_OUT,
        ExecutionResult::LaunchFailed { .. } | ExecutionResult::IoFailed { .. } => EXIT_NOT_RUN,
    }
}
