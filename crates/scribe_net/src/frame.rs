//! Wire frames for both duplex channels. One JSON object per frame, tagged
//! by a required `type` field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stage identifiers as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Core,
    Stats,
    Inventory,
    Spells,
    Features,
    Background,
}

/// Inbound frames on the one-shot import job channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobFrame {
    FetchStarted {
        url: String,
    },
    FetchComplete {
        name: String,
    },
    StageStarted {
        stage: StageKey,
    },
    StageProgress {
        stage: StageKey,
        #[serde(default)]
        message: Option<String>,
    },
    StageComplete {
        stage: StageKey,
        /// Server-reported number of completed stages. Authoritative; the
        /// backend may retry a stage.
        completed: u32,
        execution_time_ms: u64,
    },
    StageError {
        stage: StageKey,
        error: String,
    },
    AssemblyStarted,
    JobComplete {
        summary: String,
        #[serde(default)]
        data: Option<Value>,
    },
    JobError {
        error: String,
        #[serde(default)]
        stage: Option<StageKey>,
    },
}

/// Inbound frames on the conversational channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatFrame {
    ResponseChunk {
        content: String,
    },
    ResponseComplete,
    Error {
        error: String,
    },
    MessageReceived,
    HistoryCleared,
    Pong,
    RoutingMetadata {
        data: Value,
    },
    EntitiesMetadata {
        data: Value,
    },
    ContextSources {
        data: Value,
    },
    PerformanceMetrics {
        data: Value,
    },
    FeedbackId {
        data: FeedbackData,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackData {
    pub id: String,
}

/// Outbound frames on the job channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobRequest {
    CreateCharacter {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        json_data: Option<String>,
    },
}

/// Outbound frames on the conversational channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatRequest {
    Message {
        message: String,
        character_name: String,
        campaign_id: String,
    },
    ClearHistory {
        character_name: String,
        campaign_id: String,
    },
}
