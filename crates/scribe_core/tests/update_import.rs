use pretty_assertions::assert_eq;
use scribe_core::{
    update, Effect, ImportSource, JobMsg, Msg, StageId, StageState, WizardState,
    AUTO_ADVANCE_DELAY_MS,
};
use serde_json::json;

fn init_logging() {
    session_logging::initialize_for_tests();
}

fn start_import(url: &str) -> (WizardState, Vec<Effect>) {
    let (state, _) = update(WizardState::new(), Msg::SourceUrlChanged(url.to_string()));
    update(state, Msg::ImportSubmitted)
}

fn stage_state(state: &WizardState, stage: StageId) -> StageState {
    state
        .view()
        .stage_rows
        .into_iter()
        .find(|row| row.stage == stage)
        .expect("known stage")
        .state
}

#[test]
fn submitting_an_import_opens_the_job_channel_and_moves_to_parse() {
    init_logging();
    let (state, effects) = start_import("https://example.com/characters/1");

    assert!(effects.contains(&Effect::OpenJobChannel {
        source: ImportSource::Url("https://example.com/characters/1".to_string()),
    }));
    let view = state.view();
    assert_eq!(view.step_number, 2);
    assert!(view.is_running);
    assert_eq!(view.completed_stage_count, 0);
    assert!(view
        .stage_rows
        .iter()
        .all(|row| row.state == StageState::Idle));
}

#[test]
fn submitting_without_a_source_reports_an_error() {
    init_logging();
    let (state, effects) = update(WizardState::new(), Msg::ImportSubmitted);
    assert!(effects.is_empty());
    assert!(state.view().last_error.is_some());
    assert_eq!(state.view().step_number, 1);
}

#[test]
fn pasted_json_wins_over_the_url_field() {
    init_logging();
    let (state, _) = update(
        WizardState::new(),
        Msg::SourceUrlChanged("https://example.com/characters/1".to_string()),
    );
    let (state, _) = update(state, Msg::RawJsonChanged("{\"name\":\"Mira\"}".to_string()));
    let (_, effects) = update(state, Msg::ImportSubmitted);
    assert!(effects.contains(&Effect::OpenJobChannel {
        source: ImportSource::RawJson("{\"name\":\"Mira\"}".to_string()),
    }));
}

#[test]
fn full_run_completes_every_stage_and_auto_advances() {
    init_logging();
    let (mut state, _) = start_import("https://example.com/characters/1");

    for (index, stage) in StageId::ALL.into_iter().enumerate() {
        let (next, _) = update(state, Msg::Job(JobMsg::StageStarted { stage }));
        state = next;
        assert_eq!(stage_state(&state, stage), StageState::Started);

        let (next, _) = update(
            state,
            Msg::Job(JobMsg::StageProgress {
                stage,
                message: Some(format!("parsing {stage:?}")),
            }),
        );
        state = next;
        assert_eq!(stage_state(&state, stage), StageState::InProgress);

        let (next, _) = update(
            state,
            Msg::Job(JobMsg::StageComplete {
                stage,
                completed: (index + 1) as u32,
                execution_time_ms: 40,
            }),
        );
        state = next;
        assert_eq!(stage_state(&state, stage), StageState::Complete);
        assert_eq!(state.view().completed_stage_count, (index + 1) as u32);
    }

    let (state, _) = update(state, Msg::Job(JobMsg::AssemblyStarted));
    let (state, effects) = update(
        state,
        Msg::Job(JobMsg::JobComplete {
            summary: "6 sections parsed".to_string(),
            data: Some(json!({"name": "Mira", "stats": {"str": 14}})),
        }),
    );
    assert!(effects.contains(&Effect::ScheduleAutoAdvance {
        delay_ms: AUTO_ADVANCE_DELAY_MS,
    }));
    assert!(!state.view().is_running);
    assert_eq!(state.view().step_number, 2);

    let (state, _) = update(state, Msg::AutoAdvanceDue);
    assert_eq!(state.view().step_number, 3);
    assert_eq!(state.view().completed_stage_count, 6);
}

#[test]
fn completed_count_is_server_reported_and_never_decreases() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");

    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Spells,
            completed: 3,
            execution_time_ms: 10,
        }),
    );
    assert_eq!(state.view().completed_stage_count, 3);

    // A lower server figure never rolls the counter back.
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Core,
            completed: 1,
            execution_time_ms: 10,
        }),
    );
    assert_eq!(state.view().completed_stage_count, 3);
}

#[test]
fn a_failed_stage_leaves_finished_stages_alone() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");

    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Core,
            completed: 1,
            execution_time_ms: 12,
        }),
    );
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Inventory,
            completed: 2,
            execution_time_ms: 9,
        }),
    );
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageError {
            stage: StageId::Spells,
            error: "spell list malformed".to_string(),
        }),
    );

    assert_eq!(stage_state(&state, StageId::Core), StageState::Complete);
    assert_eq!(stage_state(&state, StageId::Inventory), StageState::Complete);
    assert_eq!(stage_state(&state, StageId::Spells), StageState::Error);
    // Independent failures do not end the run.
    assert!(state.view().is_running);
}

#[test]
fn finished_stages_never_reopen() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");

    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Core,
            completed: 1,
            execution_time_ms: 5,
        }),
    );
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageStarted {
            stage: StageId::Core,
        }),
    );
    assert_eq!(stage_state(&state, StageId::Core), StageState::Complete);

    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageError {
            stage: StageId::Core,
            error: "late failure".to_string(),
        }),
    );
    assert_eq!(stage_state(&state, StageId::Core), StageState::Complete);
}

#[test]
fn job_error_ends_the_run_without_advancing() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");

    let (state, effects) = update(
        state,
        Msg::Job(JobMsg::JobError {
            error: "record not found".to_string(),
            stage: None,
        }),
    );
    assert!(effects.is_empty());
    let view = state.view();
    assert!(!view.is_running);
    assert_eq!(view.last_error.as_deref(), Some("record not found"));
    assert_eq!(view.step_number, 2);

    // No parsed result, so a stray timer tick cannot advance either.
    let (state, _) = update(state, Msg::AutoAdvanceDue);
    assert_eq!(state.view().step_number, 2);
}

#[test]
fn a_dropped_job_channel_fails_an_inflight_run() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");
    let (state, _) = update(state, Msg::Job(JobMsg::ChannelClosed));
    let view = state.view();
    assert!(!view.is_running);
    assert!(view.last_error.is_some());
}

#[test]
fn the_close_after_a_finished_job_is_not_a_failure() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::JobComplete {
            summary: "done".to_string(),
            data: Some(json!({})),
        }),
    );
    let (state, _) = update(state, Msg::Job(JobMsg::ChannelClosed));
    assert!(state.view().last_error.is_none());
}

#[test]
fn a_new_run_resets_the_stage_table() {
    init_logging();
    let (state, _) = start_import("https://example.com/characters/1");
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::StageComplete {
            stage: StageId::Core,
            completed: 1,
            execution_time_ms: 5,
        }),
    );
    let (state, _) = update(
        state,
        Msg::Job(JobMsg::JobComplete {
            summary: "done".to_string(),
            data: Some(json!({})),
        }),
    );

    let (state, _) = update(state, Msg::ImportSubmitted);
    let view = state.view();
    assert!(view.is_running);
    assert_eq!(view.step_number, 2);
    assert_eq!(view.completed_stage_count, 0);
    assert!(view
        .stage_rows
        .iter()
        .all(|row| row.state == StageState::Idle));
}
