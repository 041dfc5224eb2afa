use crate::tools::safety::SafetyError;

/// Failure of a single tool call. Every variant is reported back to the
/// reasoning service as the text of the tool result.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Safety(#[from] SafetyError),
    #[error("invalid arguments for {tool}: {message}")]
    SchemaValidation { tool: String, message: String },
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("cannot {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("tool task failed: {0}")]
    Task(String),
}

impl ToolError {
    pub(crate) fn io(action: &'static str, path: &str, source: std::io::Error) -> Self {
        ToolError::Io {
            action,
            path: path.to_string(),
            source,
        }
    }
}
