use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The closed set of backend parsing stages contributing to one import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Core,
    Stats,
    Inventory,
    Spells,
    Features,
    Background,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Core,
        StageId::Stats,
        StageId::Inventory,
        StageId::Spells,
        StageId::Features,
        StageId::Background,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StageId::Core => "Core profile",
            StageId::Stats => "Ability scores",
            StageId::Inventory => "Inventory",
            StageId::Spells => "Spells",
            StageId::Features => "Features & traits",
            StageId::Background => "Background",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    #[default]
    Idle,
    Started,
    InProgress,
    Complete,
    Error,
}

impl StageState {
    /// Terminal states never transition again within a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, StageState::Complete | StageState::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageStatus {
    pub state: StageState,
    pub elapsed_ms: Option<u64>,
    pub message: Option<String>,
}

/// Per-stage status table for a single job run.
///
/// The completed counter is the server-reported value, not a local count:
/// the backend may retry a stage, so its number is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTable {
    statuses: BTreeMap<StageId, StageStatus>,
    completed_count: u32,
}

impl Default for StageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTable {
    pub fn new() -> Self {
        let statuses = StageId::ALL
            .iter()
            .map(|stage| (*stage, StageStatus::default()))
            .collect();
        Self {
            statuses,
            completed_count: 0,
        }
    }

    /// Total number of known stages.
    pub fn total(&self) -> u32 {
        StageId::ALL.len() as u32
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    pub fn status(&self, stage: StageId) -> &StageStatus {
        &self.statuses[&stage]
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageStatus)> {
        self.statuses.iter().map(|(stage, status)| (*stage, status))
    }

    /// Back to all-idle for a new run.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn stage_started(&mut self, stage: StageId) {
        let status = self.statuses.get_mut(&stage).expect("known stage");
        if status.state.is_terminal() {
            log::debug!("ignoring stage_started for finished stage {stage:?}");
            return;
        }
        *status = StageStatus {
            state: StageState::Started,
            elapsed_ms: None,
            message: None,
        };
    }

    pub fn stage_progress(&mut self, stage: StageId, message: Option<String>) {
        let status = self.statuses.get_mut(&stage).expect("known stage");
        if status.state.is_terminal() {
            log::debug!("ignoring stage_progress for finished stage {stage:?}");
            return;
        }
        status.state = StageState::InProgress;
        status.message = message;
    }

    pub fn stage_complete(&mut self, stage: StageId, completed: u32, execution_time_ms: u64) {
        let total = self.total();
        let status = self.statuses.get_mut(&stage).expect("known stage");
        if status.state.is_terminal() {
            log::debug!("ignoring stage_complete for finished stage {stage:?}");
            return;
        }
        status.state = StageState::Complete;
        status.elapsed_ms = Some(execution_time_ms);
        // Server count is authoritative; clamping keeps the counter monotonic
        // and within the known stage total.
        self.completed_count = completed.max(self.completed_count).min(total);
    }

    pub fn stage_error(&mut self, stage: StageId, message: String) {
        let status = self.statuses.get_mut(&stage).expect("known stage");
        if status.state == StageState::Complete {
            log::debug!("ignoring stage_error for completed stage {stage:?}");
            return;
        }
        status.state = StageState::Error;
        status.message = Some(message);
    }
}
