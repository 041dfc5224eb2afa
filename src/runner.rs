//! Runs the command under repair as a child process.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Exit code reported when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code reported when the program exists but could not be executed.
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// Snapshot of one execution of the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn spawn_failure(program: &str, err: &io::Error) -> Self {
        let exit_code = match err.kind() {
            io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
            _ => 1,
        };
        Self {
            exit_code,
            stdout: String::new(),
            stderr: format!("failed to run {}: {}", program, err),
        }
    }
}

/// Executes the target command inside the working directory.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    cwd: PathBuf,
}

impl CommandRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Run `command` to completion. Never fails: a command that cannot be
    /// started is reported as a failing outcome.
    #[instrument(skip(self), fields(cwd = %self.cwd.display()))]
    pub async fn run(&self, command: &str) -> CommandOutcome {
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return CommandOutcome {
                exit_code: 1,
                stdout: String::new(),
                stderr: "empty command".to_string(),
            };
        };
        let args: Vec<&str> = parts.collect();

        let search_path = self.search_path();
        let resolved = which::which_in(program, search_path.as_ref(), &self.cwd)
            .unwrap_or_else(|_| PathBuf::from(program));

        let mut cmd = Command::new(&resolved);
        cmd.args(&args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = &search_path {
            cmd.env("PATH", path);
        }

        let start = Instant::now();
        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                warn!(program, error = %e, "failed to spawn command");
                return CommandOutcome::spawn_failure(program, &e);
            }
        };

        let outcome = CommandOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(
            exit_code = outcome.exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            stdout_bytes = outcome.stdout.len(),
            stderr_bytes = outcome.stderr.len(),
            "command finished"
        );
        outcome
    }

    /// `PATH` with the project's local bin directories in front, nearest first.
    fn search_path(&self) -> Option<OsString> {
        let mut dirs: Vec<PathBuf> = local_bin_dirs(&self.cwd);
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        std::env::join_paths(dirs).ok()
    }
}

fn local_bin_dirs(cwd: &Path) -> Vec<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join("node_modules").join(".bin"))
        .filter(|dir| dir.is_dir())
        .collect()
}

/// The first and last `lines` lines of `text`, for console display.
pub fn preview(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    if all.len() <= lines * 2 {
        return all.join("\n");
    }
    let skipped = all.len() - lines * 2;
    let mut shown: Vec<String> = all[..lines].iter().map(|l| l.to_string()).collect();
    shown.push(format!("... ({} more lines)", skipped));
    shown.extend(all[all.len() - lines..].iter().map(|l| l.to_string()));
    shown.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn echo_succeeds_with_stdout() {
        let temp = TempDir::new().unwrap();
        let outcome = CommandRunner::new(temp.path()).run("echo hello").await;
        assert_eq!(
            outcome,
            CommandOutcome {
                exit_code: 0,
                stdout: "hello\n".to_string(),
                stderr: String::new(),
            }
        );
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn false_fails_with_empty_streams() {
        let temp = TempDir::new().unwrap();
        let outcome = CommandRunner::new(temp.path()).run("false").await;
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.stdout, "");
        assert_eq!(outcome.stderr, "");
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn runs_inside_working_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("marker.txt"), "present").unwrap();

        let outcome = CommandRunner::new(temp.path()).run("cat marker.txt").await;
        assert!(outcome.success());
        assert_eq!(outcome.stdout, "present");
    }

    #[tokio::test]
    async fn captures_stderr_and_exit_code() {
        let temp = TempDir::new().unwrap();
        let outcome = CommandRunner::new(temp.path()).run("cat missing.txt").await;
        assert_ne!(outcome.exit_code, 0);
        assert!(outcome.stderr.contains("missing.txt"));
    }

    #[tokio::test]
    async fn missing_program_is_a_failing_outcome() {
        let temp = TempDir::new().unwrap();
        let outcome = CommandRunner::new(temp.path())
            .run("definitely-not-a-real-program-4821 --flag")
            .await;
        assert_eq!(outcome.exit_code, EXIT_NOT_FOUND);
        assert!(outcome.stderr.contains("definitely-not-a-real-program-4821"));
    }

    #[tokio::test]
    async fn blank_command_is_a_failing_outcome() {
        let temp = TempDir::new().unwrap();
        let outcome = CommandRunner::new(temp.path()).run("   ").await;
        assert_eq!(outcome.exit_code, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn prefers_local_node_modules_bin() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("node_modules/.bin");
        fs::create_dir_all(&bin).unwrap();
        let script = bin.join("local-tool-7731");
        fs::write(&script, "#!/bin/sh\necho from-local \"$@\"\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let outcome = CommandRunner::new(temp.path()).run("local-tool-7731 a b").await;
        assert!(outcome.success(), "{outcome:?}");
        assert_eq!(outcome.stdout, "from-local a b\n");
    }

    #[test]
    fn preview_keeps_head_and_tail() {
        let text = "1\n2\n3\n4\n5\n6\n7\n";
        assert_eq!(preview(text, 2), "1\n2\n... (3 more lines)\n6\n7");
        assert_eq!(preview(text, 5), "1\n2\n3\n4\n5\n6\n7");
        assert_eq!(preview("only", 5), "only");
        assert_eq!(preview("", 5), "");
    }
}
