use std::sync::mpsc;

use scribe_core::{update, DraftSnapshot, Effect, Msg, WizardState, WizardViewModel};

use crate::config::SessionConfig;
use crate::draft::DraftStore;
use crate::effects::{now_ms, EffectRunner};

/// One import/chat session: the core aggregate, its effect runner, and the
/// draft store. All state mutation happens on the thread that calls
/// `dispatch`/`pump`; background threads only post messages.
pub struct Session {
    state: WizardState,
    store: DraftStore,
    runner: EffectRunner,
    msg_tx: mpsc::Sender<Msg>,
    msg_rx: mpsc::Receiver<Msg>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel();
        let store = DraftStore::new(config.data_dir.clone());
        let runner = EffectRunner::new(&config, msg_tx.clone());
        let mut session = Self {
            state: WizardState::new(),
            store,
            runner,
            msg_tx,
            msg_rx,
        };
        if session.store.exists() {
            session.dispatch(Msg::DraftDetected);
        }
        session
    }

    /// Applies one message and runs the resulting effects.
    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for effect in effects {
            self.apply_effect(effect);
        }
    }

    /// Drains queued messages from background threads. Returns whether the
    /// view changed.
    pub fn pump(&mut self) -> bool {
        let mut inbox = Vec::new();
        while let Ok(msg) = self.msg_rx.try_recv() {
            inbox.push(msg);
        }
        for msg in inbox {
            self.dispatch(msg);
        }
        self.state.consume_dirty()
    }

    pub fn view(&self) -> WizardViewModel {
        self.state.view()
    }

    /// Sender for background producers (timers, tests).
    pub fn sender(&self) -> mpsc::Sender<Msg> {
        self.msg_tx.clone()
    }

    pub fn draft(&self) -> Option<DraftSnapshot> {
        self.store.load()
    }

    /// Restores the persisted draft, if any, replacing navigation state.
    pub fn resume_from_draft(&mut self) -> bool {
        match self.store.load() {
            Some(draft) => {
                self.dispatch(Msg::DraftRestored(draft));
                true
            }
            None => false,
        }
    }

    pub fn shutdown(&self) {
        self.runner.shutdown();
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::SaveDraft => {
                let snapshot = self.state.snapshot(now_ms());
                self.store.save(&snapshot);
            }
            Effect::ClearDraft => self.store.clear(),
            other => self.runner.run(other),
        }
    }
}
