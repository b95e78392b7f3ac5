use crate::chat::Role;
use crate::stage::{StageId, StageState};
use crate::state::Step;

/// Render-ready projection of the wizard aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardViewModel {
    pub step: Step,
    pub step_number: u8,
    pub completed_steps: Vec<u8>,
    pub source_url: Option<String>,
    pub character_name: Option<String>,
    pub is_running: bool,
    pub assembling: bool,
    pub stage_rows: Vec<StageRowView>,
    pub completed_stage_count: u32,
    pub stage_total: u32,
    pub import_summary: Option<String>,
    pub last_error: Option<String>,
    pub has_draft: bool,
    pub messages: Vec<MessageView>,
    pub streaming_preview: Option<String>,
    pub chat_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRowView {
    pub stage: StageId,
    pub label: &'static str,
    pub state: StageState,
    pub elapsed_ms: Option<u64>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp_ms: u64,
}
