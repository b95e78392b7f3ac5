use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::chat::ChatState;
use crate::stage::StageTable;
use crate::view_model::{MessageView, StageRowView, WizardViewModel};

/// Delay between a finished import and the automatic step advance, so the
/// completed stage table is visible before the view moves on. Zero is legal.
pub const AUTO_ADVANCE_DELAY_MS: u64 = 600;

/// The ordered wizard steps. Numbering starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    Url,
    Parse,
    Stats,
    Equipment,
    Abilities,
    Character,
    Review,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Url,
        Step::Parse,
        Step::Stats,
        Step::Equipment,
        Step::Abilities,
        Step::Character,
        Step::Review,
    ];

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(number: u8) -> Option<Step> {
        Step::ALL.get(usize::from(number.checked_sub(1)?)).copied()
    }

    /// Next step, or `None` at the end of the sequence.
    pub fn next(self) -> Option<Step> {
        Step::from_number(self.number() + 1)
    }

    /// Previous step, or `None` at the start.
    pub fn prev(self) -> Option<Step> {
        Step::from_number(self.number().wrapping_sub(1))
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Url => "Source",
            Step::Parse => "Import",
            Step::Stats => "Stats",
            Step::Equipment => "Equipment",
            Step::Abilities => "Abilities",
            Step::Character => "Character",
            Step::Review => "Review",
        }
    }

    /// Key of the parsed-record section this step edits, if any.
    pub fn section_key(self) -> Option<&'static str> {
        match self {
            Step::Stats => Some("stats"),
            Step::Equipment => Some("equipment"),
            Step::Abilities => Some("abilities"),
            Step::Character => Some("character"),
            Step::Url | Step::Parse | Step::Review => None,
        }
    }
}

/// What the import job should be started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Url(String),
    RawJson(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("step {0} is not reachable yet")]
    NotReachable(u8),
}

/// Serializable subset of the wizard needed to resume a session later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub current_step: u8,
    pub completed_steps: Vec<u8>,
    pub source_url: String,
    pub parsed_result: Option<Value>,
    pub timestamp_ms: u64,
}

/// The single mutable aggregate for one import session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardState {
    current_step: StepField,
    completed_steps: BTreeSet<Step>,
    source_url: Option<String>,
    raw_input: Option<String>,
    character_name: Option<String>,
    parsed_result: Option<Value>,
    import_summary: Option<String>,
    stages: StageTable,
    is_running: bool,
    assembling: bool,
    last_error: Option<String>,
    has_draft: bool,
    chat: ChatState,
    dirty: bool,
}

// Wrapper so `Default` lands on the first step instead of needing a manual
// impl for the whole aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepField(Step);

impl Default for StepField {
    fn default() -> Self {
        StepField(Step::Url)
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> Step {
        self.current_step.0
    }

    pub fn completed_steps(&self) -> &BTreeSet<Step> {
        &self.completed_steps
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn raw_input(&self) -> Option<&str> {
        self.raw_input.as_deref()
    }

    pub fn character_name(&self) -> Option<&str> {
        self.character_name.as_deref()
    }

    pub fn parsed_result(&self) -> Option<&Value> {
        self.parsed_result.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_draft(&self) -> bool {
        self.has_draft
    }

    pub fn stages(&self) -> &StageTable {
        &self.stages
    }

    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    pub(crate) fn set_source_url(&mut self, url: String) {
        self.source_url = if url.trim().is_empty() {
            None
        } else {
            Some(url.trim().to_string())
        };
        self.mark_dirty();
    }

    pub(crate) fn set_raw_input(&mut self, raw: String) {
        self.raw_input = if raw.trim().is_empty() {
            None
        } else {
            Some(raw)
        };
        self.mark_dirty();
    }

    pub(crate) fn set_character_name(&mut self, name: String) {
        self.character_name = Some(name);
        self.mark_dirty();
    }

    pub(crate) fn set_assembling(&mut self, assembling: bool) {
        self.assembling = assembling;
        self.mark_dirty();
    }

    pub(crate) fn set_error(&mut self, error: String) {
        self.last_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn set_has_draft(&mut self, has_draft: bool) {
        self.has_draft = has_draft;
        self.mark_dirty();
    }

    pub(crate) fn stages_mut(&mut self) -> &mut StageTable {
        self.mark_dirty();
        &mut self.stages
    }

    pub(crate) fn chat_mut(&mut self) -> &mut ChatState {
        self.mark_dirty();
        &mut self.chat
    }

    /// Resolves the import source: pasted raw JSON wins over the URL field.
    pub(crate) fn import_source(&self) -> Option<ImportSource> {
        if let Some(raw) = &self.raw_input {
            return Some(ImportSource::RawJson(raw.clone()));
        }
        let candidate = self.source_url.as_deref()?;
        match url::Url::parse(candidate) {
            Ok(_) => Some(ImportSource::Url(candidate.to_string())),
            Err(err) => {
                log::debug!("rejecting source url {candidate:?}: {err}");
                None
            }
        }
    }

    /// Puts the aggregate into the starting state for a fresh job run.
    pub(crate) fn begin_run(&mut self) {
        self.stages.reset();
        self.is_running = true;
        self.assembling = false;
        self.last_error = None;
        self.import_summary = None;
        self.character_name = None;
        self.parsed_result = None;
        self.mark_dirty();
    }

    pub(crate) fn finish_run(&mut self, summary: String, data: Option<Value>) {
        self.import_summary = Some(summary);
        self.parsed_result = data;
        self.is_running = false;
        self.assembling = false;
        self.mark_dirty();
    }

    pub(crate) fn fail_run(&mut self, error: String) {
        self.last_error = Some(error);
        self.is_running = false;
        self.assembling = false;
        self.mark_dirty();
    }

    /// Moves forward one step, marking the step being left as complete.
    /// Clamped at the final step.
    pub(crate) fn advance(&mut self) -> bool {
        match self.current_step.0.next() {
            Some(next) => {
                self.completed_steps.insert(self.current_step.0);
                self.current_step = StepField(next);
                self.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Moves back one step. Never unmarks completion. Clamped at the first
    /// step.
    pub(crate) fn retreat(&mut self) -> bool {
        match self.current_step.0.prev() {
            Some(prev) => {
                self.current_step = StepField(prev);
                self.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Jumps to `step` if it is already completed, current, or the immediate
    /// successor. Anything further ahead has no prerequisite data yet.
    pub(crate) fn jump_to(&mut self, step: Step) -> Result<(), NavError> {
        let current = self.current_step.0;
        let reachable = self.completed_steps.contains(&step)
            || step == current
            || Some(step) == current.next();
        if !reachable {
            return Err(NavError::NotReachable(step.number()));
        }
        self.current_step = StepField(step);
        self.mark_dirty();
        Ok(())
    }

    pub(crate) fn edit_section(&mut self, section: Step, value: Value) -> bool {
        let Some(key) = section.section_key() else {
            log::warn!("step {section:?} has no editable section");
            return false;
        };
        let record = self
            .parsed_result
            .get_or_insert_with(|| Value::Object(Default::default()));
        match record.as_object_mut() {
            Some(object) => {
                object.insert(key.to_string(), value);
                self.mark_dirty();
                true
            }
            None => {
                log::warn!("parsed result is not an object; dropping {key} edit");
                false
            }
        }
    }

    /// A draft is only worth persisting once the session moved past the
    /// first step or captured a source URL.
    pub(crate) fn has_meaningful_progress(&self) -> bool {
        self.current_step.0 != Step::Url || self.source_url.is_some()
    }

    pub fn snapshot(&self, timestamp_ms: u64) -> DraftSnapshot {
        DraftSnapshot {
            current_step: self.current_step.0.number(),
            completed_steps: self.completed_steps.iter().map(|s| s.number()).collect(),
            source_url: self.source_url.clone().unwrap_or_default(),
            parsed_result: self.parsed_result.clone(),
            timestamp_ms,
        }
    }

    /// Replaces the navigational and data state from a persisted draft.
    /// Whole-snapshot replacement; partial drafts are never merged.
    pub(crate) fn restore(&mut self, draft: DraftSnapshot) {
        let Some(step) = Step::from_number(draft.current_step) else {
            log::warn!("draft names unknown step {}; ignoring it", draft.current_step);
            return;
        };
        self.current_step = StepField(step);
        self.completed_steps = draft
            .completed_steps
            .iter()
            .filter_map(|n| Step::from_number(*n))
            .collect();
        self.source_url = if draft.source_url.is_empty() {
            None
        } else {
            Some(draft.source_url)
        };
        self.parsed_result = draft.parsed_result;
        self.has_draft = true;
        self.mark_dirty();
    }

    /// Explicit wizard reset. Chat history is a separate surface and is
    /// left alone, as is the persisted draft slot.
    pub(crate) fn reset(&mut self) {
        let chat = std::mem::take(&mut self.chat);
        let has_draft = self.has_draft;
        *self = Self::default();
        self.chat = chat;
        self.has_draft = has_draft;
        self.mark_dirty();
    }

    pub fn view(&self) -> WizardViewModel {
        WizardViewModel {
            step: self.current_step.0,
            step_number: self.current_step.0.number(),
            completed_steps: self.completed_steps.iter().map(|s| s.number()).collect(),
            source_url: self.source_url.clone(),
            character_name: self.character_name.clone(),
            is_running: self.is_running,
            assembling: self.assembling,
            stage_rows: self
                .stages
                .iter()
                .map(|(stage, status)| StageRowView {
                    stage,
                    label: stage.label(),
                    state: status.state,
                    elapsed_ms: status.elapsed_ms,
                    message: status.message.clone(),
                })
                .collect(),
            completed_stage_count: self.stages.completed_count(),
            stage_total: self.stages.total(),
            import_summary: self.import_summary.clone(),
            last_error: self.last_error.clone(),
            has_draft: self.has_draft,
            messages: self
                .chat
                .messages()
                .iter()
                .map(|message| MessageView {
                    id: message.id.clone(),
                    role: message.role,
                    content: message.content.clone(),
                    timestamp_ms: message.timestamp_ms,
                })
                .collect(),
            streaming_preview: self.chat.pending().map(|p| p.text.clone()),
            chat_error: self.chat.last_error().map(ToOwned::to_owned),
        }
    }

    /// Returns and clears the dirty flag; used to coalesce rendering.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
