//! In-memory reasoning service for engine and orchestrator tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{ChatMessage, ContentBlock, LlmError, LlmResponse, ReasoningService, StopReason};

/// Replays canned responses in order and records every transcript it was sent.
#[derive(Default)]
pub struct ScriptedService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedService {
    pub fn new(responses: Vec<Result<LlmResponse, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ReasoningService for ScriptedService {
    async fn exchange(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<LlmResponse, LlmError> {
        assert_eq!(tools.len(), 4, "every exchange declares the four tools");
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".into())))
    }
}

pub fn text_response(text: &str) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        stop_reason: Some(StopReason::EndTurn),
        content: vec![ContentBlock::Text { text: text.into() }],
    })
}

/// A `tool_use` turn with one block per `(id, name, input)`.
pub fn tool_use_response(calls: Vec<(&str, &str, Value)>) -> Result<LlmResponse, LlmError> {
    Ok(LlmResponse {
        stop_reason: Some(StopReason::ToolUse),
        content: calls
            .into_iter()
            .map(|(id, name, input)| ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            })
            .collect(),
    })
}
