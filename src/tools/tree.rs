use ignore::WalkBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tools::error::ToolError;
use crate::tools::fs::Workspace;
use crate::tools::safety::{has_tree, safe_spawn};

const MAX_DEPTH: usize = 3;
const TREE_TIMEOUT_SECS: u64 = 10;
const SKIPPED_DIRS: [&str; 4] = ["node_modules", ".git", ".venv", "dist"];

/// Render the directory under `path` as an indented tree.
///
/// Prefers the system `tree` utility and falls back to a built-in walk when
/// it is missing or fails.
pub async fn render_tree(workspace: &Workspace, path: &str) -> Result<String, ToolError> {
    let start = workspace.resolve(path)?;

    if has_tree() {
        match tree_binary(workspace.root(), &start).await {
            Ok(text) => return Ok(text),
            Err(e) => warn!(error = %e, "tree utility failed, using built-in renderer"),
        }
    } else {
        debug!("tree utility not found, using built-in renderer");
    }

    let root = workspace.root().to_path_buf();
    tokio::task::spawn_blocking(move || render_builtin(&root, &start))
        .await
        .map_err(|e| ToolError::Task(e.to_string()))?
}

async fn tree_binary(root: &Path, start: &Path) -> Result<String, ToolError> {
    let start_str = start.to_string_lossy();
    let ignore_pattern = SKIPPED_DIRS.join("|");
    let depth = MAX_DEPTH.to_string();
    let mut args = vec!["-L", depth.as_str(), "-I", ignore_pattern.as_str()];
    if root.join(".gitignore").is_file() {
        args.push("--gitignore");
    }
    args.push(&start_str);

    let (stdout, stderr, code) = safe_spawn("tree", &args, root, TREE_TIMEOUT_SECS).await?;
    if code != 0 {
        return Err(ToolError::Task(format!("tree exited with {}: {}", code, stderr.trim())));
    }
    Ok(stdout)
}

/// Gitignore-aware tree of `start`, labelled relative to `root`.
pub fn render_builtin(root: &Path, start: &Path) -> Result<String, ToolError> {
    let label = display_label(root, start);
    if !start.is_dir() {
        return Err(ToolError::io(
            "render tree for",
            &label,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let walker = WalkBuilder::new(start)
        .hidden(false)
        .git_ignore(true)
        .require_git(false)
        .max_depth(Some(MAX_DEPTH))
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or("");
            !SKIPPED_DIRS.contains(&name)
        })
        .build();

    let mut children: BTreeMap<PathBuf, Vec<(String, bool)>> = BTreeMap::new();
    for entry in walker.flatten() {
        if entry.depth() == 0 {
            continue;
        }
        let Some(parent) = entry.path().parent() else {
            continue;
        };
        let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
        let name = entry.file_name().to_string_lossy().to_string();
        children
            .entry(parent.to_path_buf())
            .or_default()
            .push((name, is_dir));
    }
    for entries in children.values_mut() {
        entries.sort();
    }

    let mut out = label;
    out.push('\n');
    let mut counts = (0usize, 0usize);
    draw(&children, start, "", &mut out, &mut counts);
    out.push_str(&format!(
        "\n{} {}, {} {}\n",
        counts.0,
        if counts.0 == 1 { "directory" } else { "directories" },
        counts.1,
        if counts.1 == 1 { "file" } else { "files" },
    ));
    Ok(out)
}

fn draw(
    children: &BTreeMap<PathBuf, Vec<(String, bool)>>,
    dir: &Path,
    prefix: &str,
    out: &mut String,
    counts: &mut (usize, usize),
) {
    let Some(entries) = children.get(dir) else {
        return;
    };
    for (i, (name, is_dir)) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(name);
        out.push('\n');

        if *is_dir {
            counts.0 += 1;
            let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
            draw(children, &dir.join(name), &nested, out, counts);
        } else {
            counts.1 += 1;
        }
    }
}

fn display_label(root: &Path, start: &Path) -> String {
    match start.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().to_string(),
        Err(_) => start.to_string_lossy().to_string(),
    }
}
