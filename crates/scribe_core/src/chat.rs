use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// Out-of-band metadata categories delivered alongside a streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Routing,
    Entities,
    ContextSources,
    PerformanceMetrics,
}

/// A finalized chat message. Immutable once pushed, except for late-arriving
/// metadata attached by correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp_ms: u64,
    pub metadata: Vec<(MetadataKind, Value)>,
}

/// Accumulation buffer for the response currently streaming in.
/// At most one exists at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingMessage {
    pub correlation_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("a response is already streaming")]
    PendingExists,
    #[error("no streaming response to finalize")]
    NoPendingMessage,
}

/// Ordered message history plus the streaming reassembly buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatState {
    messages: Vec<Message>,
    pending: Option<PendingMessage>,
    pending_metadata: Vec<(MetadataKind, Value)>,
    last_error: Option<String>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending(&self) -> Option<&PendingMessage> {
        self.pending.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, reason: impl Into<String>) {
        self.last_error = Some(reason.into());
    }

    pub fn push_user(&mut self, content: String, timestamp_ms: u64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.messages.push(Message {
            id: id.clone(),
            role: Role::User,
            content,
            timestamp_ms,
            metadata: Vec::new(),
        });
        id
    }

    /// Opens the streaming buffer for a new assistant response.
    pub fn begin(&mut self, correlation_id: Option<String>) -> Result<(), ChatError> {
        if self.pending.is_some() {
            return Err(ChatError::PendingExists);
        }
        self.pending = Some(PendingMessage {
            correlation_id,
            text: String::new(),
        });
        Ok(())
    }

    /// Appends streamed text. A chunk with no open buffer is a protocol
    /// violation; it is logged and dropped rather than treated as fatal.
    pub fn append(&mut self, text: &str) {
        match self.pending.as_mut() {
            Some(pending) => pending.text.push_str(text),
            None => log::warn!("dropping response chunk with no streaming buffer"),
        }
    }

    /// Records the correlation id for the in-flight response.
    pub fn set_correlation_id(&mut self, id: String) {
        match self.pending.as_mut() {
            Some(pending) => pending.correlation_id = Some(id),
            None => log::warn!("feedback id {id} arrived with no streaming buffer"),
        }
    }

    /// Consumes the buffer into a finalized assistant message.
    pub fn finalize(&mut self, timestamp_ms: u64) -> Result<&Message, ChatError> {
        let pending = self.pending.take().ok_or(ChatError::NoPendingMessage)?;
        let id = pending
            .correlation_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.messages.push(Message {
            id,
            role: Role::Assistant,
            content: pending.text,
            timestamp_ms,
            metadata: std::mem::take(&mut self.pending_metadata),
        });
        Ok(self.messages.last().expect("message just pushed"))
    }

    /// Discards the buffer without producing a message.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.pending = None;
        self.pending_metadata.clear();
        self.last_error = Some(reason.into());
    }

    /// Attaches out-of-band metadata to the streaming response if one is
    /// open, otherwise to the most recent assistant message.
    pub fn attach_metadata(&mut self, kind: MetadataKind, data: Value) {
        if self.pending.is_some() {
            // Held until finalize so it lands on the message it describes.
            self.pending_metadata.push((kind, data));
            return;
        }
        match self
            .messages
            .iter_mut()
            .rev()
            .find(|message| message.role == Role::Assistant)
        {
            Some(message) => message.metadata.push((kind, data)),
            None => log::warn!("dropping {kind:?} metadata with no assistant message"),
        }
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.last_error = None;
    }
}
