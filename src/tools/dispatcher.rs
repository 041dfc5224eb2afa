use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::error::ToolError;
use crate::tools::fs::Workspace;
use crate::tools::logging::log_tool_call;
use crate::tools::tree::render_tree;

/// The fixed set of tools offered to the reasoning service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ReadFile,
    WriteFile,
    ListFiles,
    RenderTree,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::ListFiles,
        ToolKind::RenderTree,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ReadFile => "read-file",
            ToolKind::WriteFile => "write-file",
            ToolKind::ListFiles => "list-files",
            ToolKind::RenderTree => "render-tree",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Debug, Deserialize)]
struct WriteArgs {
    path: String,
    content: String,
}

/// Validates tool arguments and runs them against the workspace.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    workspace: Workspace,
}

impl ToolDispatcher {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }

    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let result = self.execute(name, args).await;
        log_tool_call(name, args, &result);
        result
    }

    async fn execute(&self, name: &str, args: &Value) -> Result<String, ToolError> {
        let kind = ToolKind::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        match kind {
            ToolKind::ReadFile => {
                let args: PathArgs = parse_args(kind, args)?;
                self.workspace.read(&args.path).await
            }
            ToolKind::WriteFile => {
                let args: WriteArgs = parse_args(kind, args)?;
                self.workspace.write(&args.path, &args.content).await?;
                Ok(format!("file written successfully: {}", args.path))
            }
            ToolKind::ListFiles => {
                let args: PathArgs = parse_args(kind, args)?;
                let files = self.workspace.list(&args.path).await?;
                Ok(files.join("\n"))
            }
            ToolKind::RenderTree => {
                let args: PathArgs = parse_args(kind, args)?;
                render_tree(&self.workspace, &args.path).await
            }
        }
    }
}

fn parse_args<T: DeserializeOwned>(kind: ToolKind, args: &Value) -> Result<T, ToolError> {
    T::deserialize(args).map_err(|e| ToolError::SchemaValidation {
        tool: kind.name().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn dispatcher(temp: &TempDir) -> ToolDispatcher {
        ToolDispatcher::new(Workspace::new(temp.path()).unwrap())
    }

    #[test]
    fn tool_names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("readFile"), None);
    }

    #[tokio::test]
    async fn read_file_returns_contents() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ts"), "export const a = 1;\n").unwrap();

        let out = dispatcher(&temp)
            .dispatch("read-file", &json!({ "path": "a.ts" }))
            .await
            .unwrap();
        assert_eq!(out, "export const a = 1;\n");
    }

    #[tokio::test]
    async fn write_file_confirms_and_writes() {
        let temp = TempDir::new().unwrap();

        let out = dispatcher(&temp)
            .dispatch("write-file", &json!({ "path": "fix.txt", "content": "fixed" }))
            .await
            .unwrap();
        assert_eq!(out, "file written successfully: fix.txt");
        assert_eq!(fs::read_to_string(temp.path().join("fix.txt")).unwrap(), "fixed");
    }

    #[tokio::test]
    async fn list_files_joins_with_newlines() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.ts"), "").unwrap();
        fs::write(temp.path().join("b.ts"), "").unwrap();

        let out = dispatcher(&temp)
            .dispatch("list-files", &json!({ "path": "." }))
            .await
            .unwrap();
        let mut lines: Vec<&str> = out.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["a.ts", "b.ts"]);
    }

    #[tokio::test]
    async fn render_tree_lists_files() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.rs"), "").unwrap();

        let out = dispatcher(&temp)
            .dispatch("render-tree", &json!({ "path": "." }))
            .await
            .unwrap();
        assert!(out.contains("main.rs"));
    }

    #[tokio::test]
    async fn missing_argument_fails_validation_without_side_effects() {
        let temp = TempDir::new().unwrap();

        let err = dispatcher(&temp)
            .dispatch("write-file", &json!({ "path": "x.txt" }))
            .await
            .unwrap_err();
        match err {
            ToolError::SchemaValidation { tool, message } => {
                assert_eq!(tool, "write-file");
                assert!(message.contains("content"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!temp.path().join("x.txt").exists());
    }

    #[tokio::test]
    async fn wrong_argument_type_fails_validation() {
        let temp = TempDir::new().unwrap();

        let err = dispatcher(&temp)
            .dispatch("read-file", &json!({ "path": 42 }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaValidation { .. }));

        let err = dispatcher(&temp)
            .dispatch("list-files", &json!("just a string"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SchemaValidation { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let temp = TempDir::new().unwrap();

        let err = dispatcher(&temp)
            .dispatch("delete-everything", &json!({ "path": "." }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "delete-everything"));
        assert_eq!(err.to_string(), "unknown tool: delete-everything");
    }

    #[tokio::test]
    async fn path_escape_is_an_error_not_a_panic() {
        let temp = TempDir::new().unwrap();

        let err = dispatcher(&temp)
            .dispatch("read-file", &json!({ "path": "../outside.txt" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access denied"));
    }
}
