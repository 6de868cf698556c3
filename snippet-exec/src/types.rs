use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{config::SandboxConfig, error::Error};

/// A snippet to execute together with its wall-clock budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct ExecutionRequest {
    source: String,
    #[serde(with = "duration_serde")]
    timeout: Duration,
}

#[derive(Deserialize)]
struct RawRequest {
    source: String,
    #[serde(with = "duration_serde")]
    timeout: Duration,
}

impl TryFrom<RawRequest> for ExecutionRequest {
    type Error = Error;

    fn try_from(raw: RawRequest) -> Result<Self, Self::Error> {
        ExecutionRequest::new(raw.source, raw.timeout)
    }
}

impl ExecutionRequest {
    /// Build a request, rejecting empty source text and a zero timeout
    pub fn new(source: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let source = source.into();
        if source.is_empty() {
            return Err(Error::InvalidRequest("source text is empty".to_string()));
        }
        if timeout.is_zero() {
            return Err(Error::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(Self { source, timeout })
    }

    /// Build a request that uses the configured default timeout
    pub fn with_default_timeout(
        source: impl Into<String>,
        config: &SandboxConfig,
    ) -> Result<Self, Error> {
        Self::new(source, config.timeout)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Severity tag of a classified diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// One line of interpreter error output, kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub kind: DiagnosticKind,
    pub text: String,
}

impl DiagnosticMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            text: text.into(),
        }
    }
}

/// How the child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    /// Exit code, absent when the process was terminated by a signal
    pub code: Option<i32>,
    /// Terminating signal number
    pub signal: Option<i32>,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;

        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

/// Terminal outcome of one execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The process exited before the deadline
    Completed {
        stdout: String,
        /// Raw error stream, including lines the classifier dropped
        stderr: String,
        diagnostics: Vec<DiagnosticMessage>,
        exit_status: ExitStatus,
        #[serde(with = "duration_serde")]
        elapsed: Duration,
    },
    /// The deadline fired first and the process was killed; no output is kept
    TimedOut {
        #[serde(with = "duration_serde")]
        timeout: Duration,
    },
    /// The interpreter, sandbox tool or profile was missing, or spawn was refused
    LaunchFailed { cause: String },
    /// The workspace could not be prepared or the process could not be awaited
    IoFailed { cause: String },
}

impl ExecutionResult {
    pub fn is_completed(&self) -> bool {
        matches!(self, ExecutionResult::Completed { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, ExecutionResult::TimedOut { .. })
    }

    pub fn status(&self) -> &'static str {
        match self {
            ExecutionResult::Completed { .. } => "completed",
            ExecutionResult::TimedOut { .. } => "timed_out",
            ExecutionResult::LaunchFailed { .. } => "launch_failed",
            ExecutionResult::IoFailed { .. } => "io_failed",
        }
    }
}

pub(crate) mod duration_serde {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
