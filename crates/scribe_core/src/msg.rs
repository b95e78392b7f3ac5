use serde_json::Value;

use crate::chat::MetadataKind;
use crate::stage::StageId;
use crate::state::{DraftSnapshot, Step};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the source URL input.
    SourceUrlChanged(String),
    /// User pasted raw character JSON as an alternative source.
    RawJsonChanged(String),
    /// User submitted the current source for import.
    ImportSubmitted,
    /// User asked for the next wizard step.
    NextClicked,
    /// User asked for the previous wizard step.
    BackClicked,
    /// User picked a specific step in the step header.
    StepSelected { step: Step },
    /// User edited one section of the parsed record.
    SectionEdited { section: Step, value: Value },
    /// Import-job channel traffic, already decoded.
    Job(JobMsg),
    /// The post-import smoothing delay elapsed.
    AutoAdvanceDue,
    /// Chat channel traffic and user chat intents.
    Chat(ChatMsg),
    /// The chat transport gave up reconnecting.
    ChatConnectionLost { reason: String },
    /// A persisted draft exists on disk (not yet loaded).
    DraftDetected,
    /// Replace navigation state from a persisted draft.
    DraftRestored(DraftSnapshot),
    /// Drop the persisted draft slot.
    ClearDraftRequested,
    /// Explicit wizard reset.
    ResetRequested,
    /// Fallback for placeholder wiring.
    NoOp,
}

/// Events from the one-shot import job channel.
#[derive(Debug, Clone, PartialEq)]
pub enum JobMsg {
    FetchStarted {
        url: String,
    },
    FetchComplete {
        name: String,
    },
    StageStarted {
        stage: StageId,
    },
    StageProgress {
        stage: StageId,
        message: Option<String>,
    },
    StageComplete {
        stage: StageId,
        completed: u32,
        execution_time_ms: u64,
    },
    /// One stage failed; the rest of the run keeps going.
    StageError {
        stage: StageId,
        error: String,
    },
    AssemblyStarted,
    JobComplete {
        summary: String,
        data: Option<Value>,
    },
    JobError {
        error: String,
        stage: Option<StageId>,
    },
    /// The job channel dropped; fatal only while a run is in flight.
    ChannelClosed,
}

/// Events from the conversational channel plus user chat intents.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMsg {
    /// User submitted a chat message. The platform stamps the clock.
    UserMessage { text: String, timestamp_ms: u64 },
    /// User asked to wipe the conversation history.
    ClearHistoryRequested,
    Chunk { content: String },
    Complete { timestamp_ms: u64 },
    StreamError { error: String },
    /// Server acknowledged receipt of the outbound message.
    Ack,
    HistoryCleared,
    /// The clear-history round trip failed or timed out.
    ClearHistoryFailed { error: String },
    Metadata { kind: MetadataKind, data: Value },
    FeedbackId { id: String },
}
