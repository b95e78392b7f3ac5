use crate::state::ImportSource;

/// Side effects requested by `update`. Executed by the platform layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the one-shot job channel and start the import from `source`.
    OpenJobChannel { source: ImportSource },
    /// Send a chat message on the conversational channel.
    SendChat {
        text: String,
        character_name: Option<String>,
    },
    /// Ask the server to wipe conversation history and await confirmation.
    ClearHistory { character_name: Option<String> },
    /// Persist the current draft snapshot.
    SaveDraft,
    /// Remove the persisted draft slot.
    ClearDraft,
    /// Post `Msg::AutoAdvanceDue` after the given delay.
    ScheduleAutoAdvance { delay_ms: u64 },
}
