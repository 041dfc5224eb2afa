use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::tools::error::ToolError;

const MAX_PREVIEW_CHARS: usize = 2_000;

/// Record one dispatched tool call. Results are truncated before they reach
/// the log; the reasoning service always gets the full text.
pub fn log_tool_call(name: &str, args: &Value, result: &Result<String, ToolError>) {
    let path = args.get("path").and_then(|v| v.as_str()).unwrap_or("");

    match result {
        Ok(output) => {
            let (preview, truncated) = truncate_string(output, MAX_PREVIEW_CHARS);
            debug!(
                tool = name,
                path,
                bytes = output.len(),
                truncated,
                "tool call succeeded"
            );
            trace!(tool = name, output = %preview, "tool result");
        }
        Err(e) => {
            warn!(tool = name, path, error = %e, "tool call failed");
        }
    }
}

/// Truncate string with metadata
pub fn truncate_string(s: &str, max_chars: usize) -> (String, bool) {
    match s.char_indices().nth(max_chars) {
        None => (s.to_string(), false),
        Some((idx, _)) => (s[..idx].to_string(), true),
    }
}
