use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum SafetyError {
    #[error("access denied: {0} is outside the current working directory")]
    PathEscape(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Command failed: {0}")]
    CommandFailed(String),
    #[error("Timeout")]
    Timeout,
}

/// Resolve `path` against `root`, rejecting anything that lands outside it.
///
/// `root` must already be absolute and normalized. Relative paths are joined
/// onto it; absolute paths are accepted only when they point inside it. The
/// check is lexical first, then repeated on the canonical form of the nearest
/// existing ancestor so a symlink cannot lead out of the root.
pub fn resolve_in_root(root: &Path, path: &str) -> Result<PathBuf, SafetyError> {
    let requested = Path::new(path);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        root.join(requested)
    };
    let resolved = normalize(&joined);

    if !resolved.starts_with(root) {
        return Err(SafetyError::PathEscape(path.to_string()));
    }

    if let Some(existing) = nearest_existing(&resolved) {
        let canonical_root = root
            .canonicalize()
            .map_err(|e| SafetyError::InvalidPath(format!("cannot canonicalize working directory: {}", e)))?;
        // A dangling symlink fails here; refusing it is the safe answer.
        let canonical = existing
            .canonicalize()
            .map_err(|_| SafetyError::PathEscape(path.to_string()))?;
        if !canonical.starts_with(&canonical_root) {
            return Err(SafetyError::PathEscape(path.to_string()));
        }
    }

    Ok(resolved)
}

/// Lexically collapse `.` and `..` components. `..` at the filesystem root
/// stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut clean = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::Prefix(prefix) => clean.push(prefix.as_os_str()),
            Component::RootDir => clean.push(comp.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            Component::Normal(part) => clean.push(part),
        }
    }
    clean
}

fn nearest_existing(path: &Path) -> Option<&Path> {
    path.ancestors()
        .find(|candidate| candidate.symlink_metadata().is_ok())
}

/// Spawn a helper program with a timeout, returning (stdout, stderr, code).
pub async fn safe_spawn(
    cmd: &str,
    args: &[&str],
    cwd: &Path,
    timeout_secs: u64,
) -> Result<(String, String, i32), SafetyError> {
    let output = timeout(
        Duration::from_secs(timeout_secs),
        Command::new(cmd)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| SafetyError::Timeout)?
    .map_err(|e| SafetyError::CommandFailed(e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    Ok((stdout, stderr, code))
}

/// Check if the `tree` utility is available
pub fn has_tree() -> bool {
    which::which("tree").is_ok()
}
