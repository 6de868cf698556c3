use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{config::SandboxConfig, error::Error};

/// Owns the process-private directory; every request gets a directory of its own inside it
pub struct WorkspaceManager {
    dir: TempDir,
    extension: String,
}

impl WorkspaceManager {
    /// Create the private directory under `workspace_root` (or the system temp dir)
    pub fn new(config: &SandboxConfig) -> Result<Self, Error> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("snippet-eval-");
        let dir = match &config.workspace_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| Error::Workspace(format!("Failed to create workspace directory: {}", e)))?;

        debug!("Workspace directory: {:?}", dir.path());

        Ok(Self {
            dir,
            extension: config.source_extension.clone(),
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create a directory private to one request and write `source` into it;
    /// the file only becomes visible once complete
    pub async fn acquire(&self, source: &str) -> Result<Workspace, Error> {
        let root = self.dir.path().to_path_buf();
        let file_name = format!("{}.{}", Uuid::new_v4(), self.extension);
        let source = source.to_owned();

        let (guard, path) =
            tokio::task::spawn_blocking(move || stage_and_publish(&root, &file_name, &source))
                .await
                .map_err(|e| Error::System(format!("Workspace writer task failed: {}", e)))??;

        debug!("Acquired workspace {:?}", path);
        Ok(Workspace {
            dir: guard.path().to_path_buf(),
            guard: Some(guard),
            path,
        })
    }
}

fn stage_and_publish(
    root: &Path,
    file_name: &str,
    source: &str,
) -> Result<(TempDir, PathBuf), Error> {
    let guard = tempfile::Builder::new()
        .prefix("run-")
        .tempdir_in(root)
        .map_err(|e| Error::Workspace(format!("Failed to create request directory: {}", e)))?;
    let target = guard.path().join(file_name);

    let write_err = |e: io::Error| Error::Workspace(format!("Failed to write source file: {}", e));

    let mut staged = tempfile::Builder::new()
        .prefix(".staging-")
        .tempfile_in(guard.path())
        .map_err(write_err)?;
    staged.write_all(source.as_bytes()).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;
    staged.persist_noclobber(&target).map_err(|e| {
        Error::Workspace(format!(
            "Failed to publish {}: {}",
            target.display(),
            e.error
        ))
    })?;

    Ok((guard, target))
}

/// One execution's private directory and the source file inside it.
///
/// The directory is the child's working directory and `HOME`; it is removed
/// with everything the child left in it on `release` or drop.
#[derive(Debug)]
pub struct Workspace {
    guard: Option<TempDir>,
    dir: PathBuf,
    path: PathBuf,
}

impl Workspace {
    /// The source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };

        match guard.close() {
            Ok(()) => debug!("Released workspace {:?}", self.dir),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Workspace {:?} was already gone at cleanup", self.dir)
            }
            Err(e) => warn!("Failed to remove workspace {:?}: {}", self.dir, e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn manager_in(root: &Path) -> WorkspaceManager {
        let config = SandboxConfig {
            workspace_root: Some(root.to_path_buf()),
            source_extension: "sh".to_string(),
            ..SandboxConfig::default()
        };
        WorkspaceManager::new(&config).unwrap()
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_acquire_writes_source() -> Result<(), Error> {
        let root = assert_fs::TempDir::new().unwrap();
        let manager = manager_in(root.path());

        let workspace = manager.acquire("echo hi\n").await?;
        assert_eq!(std::fs::read_to_string(workspace.path())?, "echo hi\n");
        assert_eq!(workspace.path().extension().unwrap(), "sh");
        assert_eq!(workspace.path().parent(), Some(workspace.dir()));
        assert_eq!(workspace.dir().parent(), Some(manager.root()));
        // only the published file remains, no staging leftovers
        assert_eq!(entries(workspace.dir()), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_each_request_gets_its_own_directory() -> Result<(), Error> {
        let root = assert_fs::TempDir::new().unwrap();
        let manager = manager_in(root.path());

        let mut dirs = HashSet::new();
        let mut held = Vec::new();
        for _ in 0..16 {
            let workspace = manager.acquire("x").await?;
            assert!(dirs.insert(workspace.dir().to_path_buf()));
            assert_eq!(entries(workspace.dir()), 1);
            held.push(workspace);
        }
        assert_eq!(entries(manager.root()), 16);
        Ok(())
    }

    #[tokio::test]
    async fn test_release_and_drop_remove_directory() -> Result<(), Error> {
        let root = assert_fs::TempDir::new().unwrap();
        let manager = manager_in(root.path());

        let released = manager.acquire("a").await?;
        let released_dir = released.dir().to_path_buf();
        // files the child leaves behind go with it
        std::fs::create_dir(released_dir.join("cache"))?;
        std::fs::write(released_dir.join("cache/state"), "left over")?;
        released.release();
        assert!(!released_dir.exists());

        let dir = {
            let dropped = manager.acquire("b").await?;
            dropped.dir().to_path_buf()
        };
        assert!(!dir.exists());
        assert_eq!(entries(manager.root()), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_release_tolerates_missing_directory() -> Result<(), Error> {
        let root = assert_fs::TempDir::new().unwrap();
        let manager = manager_in(root.path());

        let workspace = manager.acquire("a").await?;
        std::fs::remove_dir_all(workspace.dir())?;
        workspace.release();
        Ok(())
    }

    #[test]
    fn test_unwritable_root_fails() {
        let config = SandboxConfig {
            workspace_root: Some(PathBuf::from("/nonexistent/snippet-root")),
            ..SandboxConfig::default()
        };
        let result = WorkspaceManager::new(&config);
        assert!(matches!(result, Err(Error::Workspace(_))));
    }

    #[tokio::test]
    async fn test_private_directory_removed_with_manager() {
        let root = assert_fs::TempDir::new().unwrap();
        let manager = manager_in(root.path());
        let dir = manager.root().to_path_buf();
        assert!(dir.exists());
        drop(manager);
        assert!(!dir.exists());
    }
}
