use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::llm::{
    ChatMessage, ContentBlock, LlmError, ReasoningService, ToolCallRequest, ToolCallResult,
};
use crate::progress::{Progress, Silent};
use crate::runner::CommandOutcome;
use crate::tools::{tool_schemas, ToolDispatcher, ToolError};
use crate::workflows::prompt::{compose_prompt, DEFAULT_PROMPT};
use crate::workflows::transcript::{Transcript, TranscriptError, TranscriptPolicy};

/// Stand-in text for a responder turn that came back with no content blocks.
const EMPTY_REPLY: &str = "(no response)";

#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    AwaitingResponse,
    ExecutingTools(Vec<ToolCallRequest>),
    Done(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("protocol violation: {reason}")]
    ProtocolViolation { reason: String, transcript: String },
    #[error(transparent)]
    Service(#[from] LlmError),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

/// Drives one repair attempt: exchanges turns with the reasoning service and
/// runs the tools it asks for until it answers with plain text.
pub struct ConversationEngine<S> {
    service: S,
    dispatcher: ToolDispatcher,
    tools: Vec<Value>,
    instructions: String,
    transcript: Transcript,
    progress: Arc<dyn Progress>,
}

impl<S: ReasoningService> ConversationEngine<S> {
    pub fn new(service: S, dispatcher: ToolDispatcher, policy: TranscriptPolicy) -> Self {
        Self {
            service,
            dispatcher,
            tools: tool_schemas(),
            instructions: DEFAULT_PROMPT.to_string(),
            transcript: Transcript::new(policy),
            progress: Arc::new(Silent),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Report a failing run to the service and work with it until it stops
    /// calling tools. Returns the final text of the responder.
    #[instrument(skip(self, outcome), fields(exit_code = outcome.exit_code))]
    pub async fn repair(
        &mut self,
        command: &str,
        outcome: &CommandOutcome,
        iteration: usize,
    ) -> Result<String, EngineError> {
        let prompt = compose_prompt(command, outcome, &self.instructions);
        self.transcript.begin_attempt(prompt)?;

        let mut state = EngineState::AwaitingResponse;
        loop {
            state = match state {
                EngineState::AwaitingResponse => self.await_response(iteration).await?,
                EngineState::ExecutingTools(calls) => {
                    let results = self.execute_tools(calls, iteration).await;
                    self.transcript.push(ChatMessage::tool_results(results))?;
                    EngineState::AwaitingResponse
                }
                EngineState::Done(reply) => {
                    info!(turns = self.transcript.len(), "repair attempt finished");
                    self.progress.attempt_finished(iteration, &reply);
                    return Ok(reply);
                }
            };
        }
    }

    async fn await_response(&mut self, iteration: usize) -> Result<EngineState, EngineError> {
        let response = self
            .service
            .exchange(self.transcript.turns(), &self.tools)
            .await?;

        let declared_tool_use = response.declares_tool_use();
        let mut content = response.content;
        if content.is_empty() {
            content.push(ContentBlock::Text {
                text: EMPTY_REPLY.to_string(),
            });
        }
        let message = ChatMessage::assistant(content);
        let calls = message.tool_calls();
        let text = message.text();
        self.transcript.push(message)?;

        if calls.is_empty() {
            if declared_tool_use {
                return Err(EngineError::ProtocolViolation {
                    reason: "stop reason is tool_use but the response has no tool calls"
                        .to_string(),
                    transcript: self.transcript.dump(),
                });
            }
            return Ok(EngineState::Done(text.unwrap_or_default()));
        }

        if let Some(text) = text {
            self.progress.responder_text(iteration, &text);
        }
        debug!(count = calls.len(), "responder requested tool calls");
        Ok(EngineState::ExecutingTools(calls))
    }

    /// Run every call on its own task and wait for all of them. Results come
    /// back in request order.
    async fn execute_tools(
        &self,
        calls: Vec<ToolCallRequest>,
        iteration: usize,
    ) -> Vec<ToolCallResult> {
        let handles = calls.iter().map(|call| {
            self.progress.tool_invoked(iteration, call);
            let dispatcher = self.dispatcher.clone();
            let name = call.name.clone();
            let args = call.arguments.clone();
            tokio::spawn(async move { dispatcher.dispatch(&name, &args).await })
        });
        let joined = join_all(handles).await;

        calls
            .into_iter()
            .zip(joined)
            .map(|(call, joined)| {
                let result = joined.unwrap_or_else(|e| {
                    debug!(tool = %call.name, id = %call.id, error = %e, "tool task did not complete");
                    Err(ToolError::Task(e.to_string()))
                });
                match result {
                    Ok(output) => ToolCallResult::success(call.id, output),
                    Err(e) => ToolCallResult::failure(call.id, e.to_string()),
                }
            })
            .collect()
    }
}
