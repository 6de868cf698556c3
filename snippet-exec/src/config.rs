use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{error::Error, types::duration_serde};

/// Default wall-clock budget for one snippet
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How snippets are launched and bounded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter or compiler driver that receives the workspace file
    pub interpreter: PathBuf,
    /// Extra arguments placed before the workspace file
    pub interpreter_args: Vec<String>,
    /// Sandboxing tool wrapping the interpreter
    pub sandbox_tool: PathBuf,
    /// Opaque policy file handed to the sandboxing tool
    pub profile: PathBuf,
    /// Extension of the workspace file, without the dot
    pub source_extension: String,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    /// Pause between SIGTERM and SIGKILL once the deadline fired
    #[serde(with = "duration_serde")]
    pub kill_grace: Duration,
    /// Bytes kept per stream
    pub output_limit: usize,
    pub max_concurrent: usize,
    /// Parent of the process-private workspace directory
    pub workspace_root: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: PathBuf::from("/usr/bin/swift"),
            interpreter_args: Vec::new(),
            sandbox_tool: PathBuf::from("/usr/bin/sandbox-exec"),
            profile: PathBuf::from("./swiftexec.sb"),
            source_extension: "swift".to_string(),
            timeout: DEFAULT_TIMEOUT,
            kill_grace: Duration::from_millis(10),
            output_limit: 1024 * 1024, // 1MB
            max_concurrent: 4,
            workspace_root: None,
        }
    }
}

impl SandboxConfig {
    /// Load a configuration file; missing keys fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(Error::Config(
                "max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.interpreter.as_os_str().is_empty() {
            return Err(Error::Config("interpreter path is empty".to_string()));
        }
        if self.sandbox_tool.as_os_str().is_empty() {
            return Err(Error::Config("sandbox tool path is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.sandbox_tool, PathBuf::from("/usr/bin/sandbox-exec"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<(), Error> {
        let config = SandboxConfig::from_toml(
            r#"
            interpreter = "/usr/bin/python3"
            source_extension = "py"
            timeout = 0.5
            "#,
        )?;
        assert_eq!(config.interpreter, PathBuf::from("/usr/bin/python3"));
        assert_eq!(config.source_extension, "py");
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_concurrent, 4);
        Ok(())
    }

    #[test]
    fn test_load_rejects_zero_timeout() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("eval.toml");
        file.write_str("timeout = 0\n").unwrap();

        let result = SandboxConfig::load(file.path());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = SandboxConfig::load("/nonexistent/eval.toml");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let result = SandboxConfig::from_toml("max_concurrent = \"many\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
