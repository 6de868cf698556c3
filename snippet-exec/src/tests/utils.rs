use crate::config::SandboxConfig;
use crate::workspace::{Workspace, WorkspaceManager};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Stand-in for `sandbox-exec`: checks and strips `-f <profile>`, then runs the rest
const STUB_SANDBOX: &str = r#"#!/bin/sh
[ "$1" = "-f" ] || { echo "stub sandbox: expected -f" >&2; exit 64; }
[ -r "$2" ] || { echo "stub sandbox: unreadable profile $2" >&2; exit 65; }
shift 2
exec "$@"
"#;

static STUB_TOOL: OnceLock<PathBuf> = OnceLock::new();

/// Written once per test process so no test execs a file another thread is still writing
fn stub_sandbox_tool() -> &'static Path {
    STUB_TOOL.get_or_init(|| {
        let dir = std::env::temp_dir().join(format!("snippet-exec-stub-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let tool = dir.join("sandbox-exec");
        std::fs::write(&tool, STUB_SANDBOX).unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
        tool
    })
}

/// Per-test sandbox: a profile, a workspace root and the shared stub tool
pub struct TestSandbox {
    workspaces: WorkspaceManager,
    dir: TempDir,
}

impl TestSandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        dir.child("swiftexec.sb")
            .write_str("(version 1)\n(allow default)\n")
            .unwrap();
        dir.child("work").create_dir_all().unwrap();
        let workspaces = WorkspaceManager::new(&config_in(dir.path())).unwrap();
        Self { workspaces, dir }
    }

    /// `/bin/sh` as the interpreter, behind the stub sandbox tool
    pub fn config(&self) -> SandboxConfig {
        config_in(self.dir.path())
    }

    /// A workspace holding `body` as its shell script, for launching directly
    pub async fn workspace(&self, body: &str) -> Workspace {
        self.workspaces.acquire(body).await.unwrap()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn config_in(dir: &Path) -> SandboxConfig {
    SandboxConfig {
        interpreter: PathBuf::from("/bin/sh"),
        interpreter_args: Vec::new(),
        sandbox_tool: stub_sandbox_tool().to_path_buf(),
        profile: dir.join("swiftexec.sb"),
        source_extension: "sh".to_string(),
        timeout: Duration::from_secs(5),
        kill_grace: Duration::from_millis(10),
        output_limit: 1024 * 1024,
        max_concurrent: 4,
        workspace_root: Some(dir.join("work")),
    }
}

pub fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

pub fn short_timeout() -> Duration {
    Duration::from_millis(300)
}
