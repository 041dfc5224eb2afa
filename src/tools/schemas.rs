use serde_json::{json, Value};

use crate::tools::dispatcher::ToolKind;

/// Tool declarations sent with every exchange, in Messages API shape.
pub fn tool_schemas() -> Vec<Value> {
    ToolKind::ALL.iter().map(|kind| tool_schema(*kind)).collect()
}

pub fn tool_schema(kind: ToolKind) -> Value {
    match kind {
        ToolKind::ReadFile => read_file_schema(),
        ToolKind::WriteFile => write_file_schema(),
        ToolKind::ListFiles => list_files_schema(),
        ToolKind::RenderTree => render_tree_schema(),
    }
}

fn read_file_schema() -> Value {
    json!({
        "name": ToolKind::ReadFile.name(),
        "description": "Read the contents of a file in the current working directory.",
        "input_schema": {
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to read, relative to the current working directory"
                }
            },
            "required": ["path"]
        }
    })
}

fn write_file_schema() -> Value {
    json!({
        "name": ToolKind::WriteFile.name(),
        "description": "Write content to a file in the current working directory, replacing any existing content. The parent directory must exist.",
        "input_schema": {
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the file to write, relative to the current working directory"
                },
                "content": {
                    "type": "string",
                    "description": "The complete new content of the file"
                }
            },
            "required": ["path", "content"]
        }
    })
}

fn list_files_schema() -> Value {
    json!({
        "name": ToolKind::ListFiles.name(),
        "description": "List the entries of one directory in the current working directory (not recursive).",
        "input_schema": {
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the directory to list, relative to the current working directory"
                }
            },
            "required": ["path"]
        }
    })
}

fn render_tree_schema() -> Value {
    json!({
        "name": ToolKind::RenderTree.name(),
        "description": "Display the directory structure as a tree, skipping files matched by .gitignore.",
        "input_schema": {
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Root directory of the tree, relative to the current working directory"
                }
            },
            "required": ["path"]
        }
    })
}
