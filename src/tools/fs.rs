use std::path::{Path, PathBuf};

use crate::tools::error::ToolError;
use crate::tools::safety::{normalize, resolve_in_root, SafetyError};

/// Read, write and list files without leaving the working directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = root.as_ref();
        if !root.is_absolute() {
            return Err(SafetyError::InvalidPath(format!(
                "working directory must be absolute: {}",
                root.display()
            )));
        }
        Ok(Self {
            root: normalize(root),
        })
    }

    /// Workspace rooted at the directory the process was started from.
    pub fn current() -> Result<Self, SafetyError> {
        let cwd = std::env::current_dir()
            .map_err(|e| SafetyError::InvalidPath(format!("Cannot get current dir: {}", e)))?;
        Self::new(cwd)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> Result<PathBuf, SafetyError> {
        resolve_in_root(&self.root, path)
    }

    pub async fn read(&self, path: &str) -> Result<String, ToolError> {
        let full_path = self.resolve(path)?;
        tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| ToolError::io("read", path, e))
    }

    /// Create or overwrite a file. The parent directory must already exist.
    pub async fn write(&self, path: &str, content: &str) -> Result<(), ToolError> {
        let full_path = self.resolve(path)?;
        tokio::fs::write(&full_path, content)
            .await
            .map_err(|e| ToolError::io("write", path, e))
    }

    /// Entries of one directory, relative to the workspace root, in the order
    /// the filesystem reports them.
    pub async fn list(&self, path: &str) -> Result<Vec<String>, ToolError> {
        let full_path = self.resolve(path)?;
        let mut entries = tokio::fs::read_dir(&full_path)
            .await
            .map_err(|e| ToolError::io("list", path, e))?;

        let mut files = vec![];
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::io("list", path, e))?
        {
            let entry_path = entry.path();
            let rel_path = entry_path
                .strip_prefix(&self.root)
                .unwrap_or(&entry_path)
                .to_string_lossy()
                .to_string();
            files.push(rel_path);
        }
        Ok(files)
    }
}
