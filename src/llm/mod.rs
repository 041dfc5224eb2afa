pub mod client;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use client::LlmClient;
pub use types::{
    ChatMessage, ContentBlock, LlmConfig, LlmError, LlmResponse, Role, StopReason,
    ToolCallRequest, ToolCallResult,
};

/// The reasoning service: given the transcript and the tool declarations,
/// produce the next responder turn.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn exchange(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<LlmResponse, LlmError>;
}

#[async_trait]
impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    async fn exchange(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<LlmResponse, LlmError> {
        (**self).exchange(messages, tools).await
    }
}
