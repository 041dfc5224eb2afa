//! Human-facing progress reporting for a repair run.

use crate::llm::ToolCallRequest;
use crate::runner::{preview, CommandOutcome};
use crate::tools::ToolKind;

/// Receives progress events from the orchestrator and the conversation
/// engine. Every method defaults to doing nothing.
pub trait Progress: Send + Sync {
    fn command_started(&self, _iteration: usize, _command: &str) {}
    fn command_failed(&self, _iteration: usize, _outcome: &CommandOutcome) {}
    fn command_passed(&self, _iteration: usize, _command: &str, _outcome: &CommandOutcome) {}
    fn responder_text(&self, _iteration: usize, _text: &str) {}
    fn tool_invoked(&self, _iteration: usize, _call: &ToolCallRequest) {}
    fn attempt_finished(&self, _iteration: usize, _reply: &str) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {}

/// Prints progress to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleProgress {
    preview_lines: usize,
}

impl ConsoleProgress {
    pub fn new(preview_lines: usize) -> Self {
        Self { preview_lines }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Progress for ConsoleProgress {
    fn command_started(&self, iteration: usize, command: &str) {
        if iteration == 0 {
            println!("Making {} pass", command);
        } else {
            println!("Iteration {}: checking if {} passes...", iteration, command);
        }
    }

    fn command_failed(&self, iteration: usize, outcome: &CommandOutcome) {
        let stream = if outcome.stderr.trim().is_empty() {
            &outcome.stdout
        } else {
            &outcome.stderr
        };
        let shown = preview(stream, self.preview_lines);
        if !shown.is_empty() {
            println!("{}", shown);
        }
        println!(
            "Iteration {}: command failed with exit code {}, let's make it pass.",
            iteration, outcome.exit_code
        );
    }

    fn command_passed(&self, _iteration: usize, command: &str, outcome: &CommandOutcome) {
        let shown = preview(&outcome.stdout, self.preview_lines);
        if !shown.is_empty() {
            println!("{}", shown);
        }
        println!("Command {} passed", command);
    }

    fn responder_text(&self, iteration: usize, text: &str) {
        println!("Iteration {}: {}", iteration, text);
    }

    fn tool_invoked(&self, iteration: usize, call: &ToolCallRequest) {
        println!("Iteration {}: {}", iteration, describe_call(call));
    }

    fn attempt_finished(&self, iteration: usize, reply: &str) {
        if !reply.trim().is_empty() {
            println!("Iteration {}: {}", iteration, reply);
        }
    }
}

/// One-line description of a tool call, e.g. `Reading file: src/a.ts`.
pub fn describe_call(call: &ToolCallRequest) -> String {
    let path = call
        .arguments
        .get("path")
        .and_then(|v| v.as_str())
        .unwrap_or("?");
    match ToolKind::from_name(&call.name) {
        Some(ToolKind::ReadFile) => format!("Reading file: {}", path),
        Some(ToolKind::WriteFile) => format!("Writing to file: {}", path),
        Some(ToolKind::ListFiles) => format!("Listing files in directory: {}", path),
        Some(ToolKind::RenderTree) => format!("Generating tree for directory: {}", path),
        None => format!("Calling unknown tool: {}", call.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest {
            id: "t".into(),
            name: name.into(),
            arguments: args,
        }
    }

    #[test]
    fn describes_known_tools() {
        assert_eq!(
            describe_call(&call("write-file", json!({ "path": "a.ts", "content": "" }))),
            "Writing to file: a.ts"
        );
        assert_eq!(
            describe_call(&call("render-tree", json!({ "path": "." }))),
            "Generating tree for directory: ."
        );
    }

    #[test]
    fn describes_malformed_calls_without_panicking() {
        assert_eq!(describe_call(&call("read-file", json!(null))), "Reading file: ?");
        assert_eq!(
            describe_call(&call("rm", json!({}))),
            "Calling unknown tool: rm"
        );
    }
}
