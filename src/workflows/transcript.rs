use crate::llm::{ChatMessage, Role};

/// How much history survives when a new repair attempt starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptPolicy {
    /// Keep every turn of every attempt.
    Unbounded,
    /// Keep the turns of the last `n` attempts, the new one included.
    RetainAttempts(usize),
}

impl Default for TranscriptPolicy {
    fn default() -> Self {
        TranscriptPolicy::RetainAttempts(3)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("transcript must start with a user turn")]
    MustStartWithUser,
    #[error("two consecutive {0:?} turns")]
    ConsecutiveRole(Role),
}

/// Ordered exchange history with the reasoning service.
///
/// Turns strictly alternate between user and assistant. Eviction happens only
/// at attempt boundaries, so a kept tool result always has its tool call.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<ChatMessage>,
    attempt_starts: Vec<usize>,
    policy: TranscriptPolicy,
}

impl Transcript {
    pub fn new(policy: TranscriptPolicy) -> Self {
        Self {
            turns: Vec::new(),
            attempt_starts: Vec::new(),
            policy,
        }
    }

    /// Open a new repair attempt with the failure prompt as its first turn.
    pub fn begin_attempt(&mut self, prompt: String) -> Result<(), TranscriptError> {
        if self.turns.last().is_some_and(|last| last.role == Role::User) {
            return Err(TranscriptError::ConsecutiveRole(Role::User));
        }
        self.evict_for_new_attempt();
        let start = self.turns.len();
        self.push(ChatMessage::user_text(prompt))?;
        self.attempt_starts.push(start);
        Ok(())
    }

    pub fn push(&mut self, message: ChatMessage) -> Result<(), TranscriptError> {
        match self.turns.last() {
            None if message.role != Role::User => return Err(TranscriptError::MustStartWithUser),
            Some(last) if last.role == message.role => {
                return Err(TranscriptError::ConsecutiveRole(message.role))
            }
            _ => {}
        }
        self.turns.push(message);
        Ok(())
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn attempts(&self) -> usize {
        self.attempt_starts.len()
    }

    /// Pretty JSON of every turn, for post-mortem output.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.turns)
            .unwrap_or_else(|e| format!("<transcript could not be serialized: {}>", e))
    }

    fn evict_for_new_attempt(&mut self) {
        let TranscriptPolicy::RetainAttempts(keep) = self.policy else {
            return;
        };
        // The attempt about to begin takes one of the `keep` slots.
        let keep_previous = keep.saturating_sub(1);
        if self.attempt_starts.len() <= keep_previous {
            return;
        }
        let drop_attempts = self.attempt_starts.len() - keep_previous;
        let cut = self
            .attempt_starts
            .get(drop_attempts)
            .copied()
            .unwrap_or(self.turns.len());

        self.turns.drain(..cut);
        self.attempt_starts.drain(..drop_attempts);
        for start in &mut self.attempt_starts {
            *start -= cut;
        }
    }
}
