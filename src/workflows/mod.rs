pub mod conversation;
pub mod prompt;
pub mod repair;
pub mod transcript;

pub use conversation::{ConversationEngine, EngineError, EngineState};
pub use prompt::{compose_prompt, DEFAULT_PROMPT};
pub use repair::{RepairError, RepairOrchestrator, RepairState, RepairSummary};
pub use transcript::{Transcript, TranscriptError, TranscriptPolicy};
