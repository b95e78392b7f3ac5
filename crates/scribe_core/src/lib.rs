//! Scribe core: pure wizard state machine, progress aggregation, and the
//! streaming chat buffer. No I/O; platform layers feed `Msg`s in and run the
//! returned `Effect`s.
mod chat;
mod effect;
mod msg;
mod stage;
mod state;
mod update;
mod view_model;

pub use chat::{ChatError, ChatState, Message, MetadataKind, PendingMessage, Role};
pub use effect::Effect;
pub use msg::{ChatMsg, JobMsg, Msg};
pub use stage::{StageId, StageState, StageStatus, StageTable};
pub use state::{
    DraftSnapshot, ImportSource, NavError, Step, WizardState, AUTO_ADVANCE_DELAY_MS,
};
pub use update::update;
pub use view_model::{MessageView, StageRowView, WizardViewModel};
