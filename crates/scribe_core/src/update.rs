use crate::{ChatMsg, Effect, JobMsg, Msg, WizardState, AUTO_ADVANCE_DELAY_MS};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WizardState, msg: Msg) -> (WizardState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourceUrlChanged(url) => {
            state.set_source_url(url);
            Vec::new()
        }
        Msg::RawJsonChanged(raw) => {
            state.set_raw_input(raw);
            Vec::new()
        }
        Msg::ImportSubmitted => {
            if state.is_running() {
                return (state, Vec::new());
            }
            let Some(source) = state.import_source() else {
                state.set_error("enter a character URL or paste character JSON".to_string());
                return (state, Vec::new());
            };
            state.begin_run();
            let mut effects = vec![Effect::OpenJobChannel { source }];
            // The import always lands the wizard on the parse step.
            if state.current_step() == crate::Step::Url {
                advance_and_save(&mut state, &mut effects);
            } else if state.current_step() != crate::Step::Parse
                && state.jump_to(crate::Step::Parse).is_ok()
            {
                push_save(&mut state, &mut effects);
            }
            effects
        }
        Msg::NextClicked => {
            let mut effects = Vec::new();
            if state.advance() {
                push_save(&mut state, &mut effects);
            }
            effects
        }
        Msg::BackClicked => {
            state.retreat();
            Vec::new()
        }
        Msg::StepSelected { step } => {
            if let Err(err) = state.jump_to(step) {
                log::debug!("navigation rejected: {err}");
            }
            Vec::new()
        }
        Msg::SectionEdited { section, value } => {
            let mut effects = Vec::new();
            if state.edit_section(section, value) {
                push_save(&mut state, &mut effects);
            }
            effects
        }
        Msg::Job(job) => update_job(&mut state, job),
        Msg::AutoAdvanceDue => {
            // Only meaningful right after a finished import; a user who
            // already navigated away keeps their position.
            let mut effects = Vec::new();
            if !state.is_running()
                && state.parsed_result().is_some()
                && state.current_step() == crate::Step::Parse
                && state.advance()
            {
                push_save(&mut state, &mut effects);
            }
            effects
        }
        Msg::Chat(chat) => update_chat(&mut state, chat),
        Msg::ChatConnectionLost { reason } => {
            state.chat_mut().set_error(reason);
            Vec::new()
        }
        Msg::DraftDetected => {
            state.set_has_draft(true);
            Vec::new()
        }
        Msg::DraftRestored(draft) => {
            state.restore(draft);
            Vec::new()
        }
        Msg::ClearDraftRequested => {
            state.set_has_draft(false);
            vec![Effect::ClearDraft]
        }
        Msg::ResetRequested => {
            state.reset();
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn update_job(state: &mut WizardState, job: JobMsg) -> Vec<Effect> {
    match job {
        JobMsg::FetchStarted { url } => {
            log::info!("fetching character record from {url}");
            Vec::new()
        }
        JobMsg::FetchComplete { name } => {
            state.set_character_name(name);
            Vec::new()
        }
        JobMsg::StageStarted { stage } => {
            state.stages_mut().stage_started(stage);
            Vec::new()
        }
        JobMsg::StageProgress { stage, message } => {
            state.stages_mut().stage_progress(stage, message);
            Vec::new()
        }
        JobMsg::StageComplete {
            stage,
            completed,
            execution_time_ms,
        } => {
            state
                .stages_mut()
                .stage_complete(stage, completed, execution_time_ms);
            Vec::new()
        }
        JobMsg::StageError { stage, error } => {
            // Stage failures compose; only job_error ends the run.
            state.stages_mut().stage_error(stage, error);
            Vec::new()
        }
        JobMsg::AssemblyStarted => {
            state.set_assembling(true);
            Vec::new()
        }
        JobMsg::JobComplete { summary, data } => {
            state.finish_run(summary, data);
            vec![Effect::ScheduleAutoAdvance {
                delay_ms: AUTO_ADVANCE_DELAY_MS,
            }]
        }
        JobMsg::JobError { error, stage } => {
            if let Some(stage) = stage {
                state.stages_mut().stage_error(stage, error.clone());
            }
            state.fail_run(error);
            Vec::new()
        }
        JobMsg::ChannelClosed => {
            if state.is_running() {
                state.fail_run("connection to the import service was lost".to_string());
            }
            Vec::new()
        }
    }
}

fn update_chat(state: &mut WizardState, chat: ChatMsg) -> Vec<Effect> {
    match chat {
        ChatMsg::UserMessage { text, timestamp_ms } => {
            if text.trim().is_empty() {
                return Vec::new();
            }
            state.chat_mut().push_user(text.clone(), timestamp_ms);
            vec![Effect::SendChat {
                text,
                character_name: state.character_name().map(ToOwned::to_owned),
            }]
        }
        ChatMsg::ClearHistoryRequested => {
            // History is only dropped once the server confirms.
            vec![Effect::ClearHistory {
                character_name: state.character_name().map(ToOwned::to_owned),
            }]
        }
        ChatMsg::Chunk { content } => {
            let chat = state.chat_mut();
            if chat.pending().is_none() {
                // First chunk of a response opens the buffer.
                chat.begin(None).expect("no pending message");
            }
            chat.append(&content);
            Vec::new()
        }
        ChatMsg::Complete { timestamp_ms } => {
            if let Err(err) = state.chat_mut().finalize(timestamp_ms) {
                log::warn!("response_complete out of sequence: {err}");
            }
            Vec::new()
        }
        ChatMsg::StreamError { error } => {
            state.chat_mut().fail(error);
            Vec::new()
        }
        ChatMsg::Ack => Vec::new(),
        ChatMsg::HistoryCleared => {
            state.chat_mut().clear_messages();
            Vec::new()
        }
        ChatMsg::ClearHistoryFailed { error } => {
            state.chat_mut().set_error(error);
            Vec::new()
        }
        ChatMsg::Metadata { kind, data } => {
            state.chat_mut().attach_metadata(kind, data);
            Vec::new()
        }
        ChatMsg::FeedbackId { id } => {
            state.chat_mut().set_correlation_id(id);
            Vec::new()
        }
    }
}

fn advance_and_save(state: &mut WizardState, effects: &mut Vec<Effect>) {
    if state.advance() {
        push_save(state, effects);
    }
}

fn push_save(state: &mut WizardState, effects: &mut Vec<Effect>) {
    if state.has_meaningful_progress() {
        state.set_has_draft(true);
        effects.push(Effect::SaveDraft);
    }
}
