use pretty_assertions::assert_eq;
use scribe_core::{update, Effect, Msg, Step, WizardState};

fn init_logging() {
    session_logging::initialize_for_tests();
}

#[test]
fn advance_marks_steps_complete_and_clamps_at_the_end() {
    init_logging();
    let mut state = WizardState::new();

    for expected in 2..=7u8 {
        let (next, _effects) = update(state, Msg::NextClicked);
        state = next;
        assert_eq!(state.view().step_number, expected);
    }
    assert_eq!(state.view().completed_steps, vec![1, 2, 3, 4, 5, 6]);

    // Already at the last step; nothing moves and nothing is saved.
    let (state, effects) = update(state, Msg::NextClicked);
    assert_eq!(state.view().step_number, 7);
    assert!(effects.is_empty());
}

#[test]
fn retreat_clamps_at_the_first_step_and_keeps_completion() {
    init_logging();
    let (state, _) = update(WizardState::new(), Msg::NextClicked);
    let (state, _) = update(state, Msg::BackClicked);
    assert_eq!(state.view().step_number, 1);
    assert_eq!(state.view().completed_steps, vec![1]);

    let (state, effects) = update(state, Msg::BackClicked);
    assert_eq!(state.view().step_number, 1);
    assert!(effects.is_empty());
}

#[test]
fn jumping_ahead_of_prerequisites_is_rejected() {
    init_logging();
    let state = WizardState::new();

    for step in [Step::Stats, Step::Equipment, Step::Review] {
        let (next, effects) = update(state.clone(), Msg::StepSelected { step });
        assert_eq!(next.view().step_number, 1, "jump to {step:?} must not move");
        assert!(effects.is_empty());
    }

    // The immediate successor is always reachable.
    let (state, _) = update(state, Msg::StepSelected { step: Step::Parse });
    assert_eq!(state.view().step_number, 2);
}

#[test]
fn completed_steps_stay_reachable_after_going_back() {
    init_logging();
    let (state, _) = update(WizardState::new(), Msg::NextClicked);
    let (state, _) = update(state, Msg::NextClicked);
    assert_eq!(state.view().step_number, 3);

    let (state, _) = update(state, Msg::StepSelected { step: Step::Url });
    assert_eq!(state.view().step_number, 1);

    // Both were marked complete on the way forward.
    let (state, _) = update(state, Msg::StepSelected { step: Step::Parse });
    assert_eq!(state.view().step_number, 2);
    let (state, _) = update(state, Msg::StepSelected { step: Step::Stats });
    assert_eq!(state.view().step_number, 3);
}

#[test]
fn advancing_with_progress_schedules_a_draft_save() {
    init_logging();
    let (state, _) = update(
        WizardState::new(),
        Msg::SourceUrlChanged("https://example.com/characters/1".to_string()),
    );
    let (state, effects) = update(state, Msg::NextClicked);
    assert!(effects.contains(&Effect::SaveDraft));
    assert!(state.view().has_draft);
}

#[test]
fn reset_returns_to_the_first_step() {
    init_logging();
    let (state, _) = update(WizardState::new(), Msg::NextClicked);
    let (state, _) = update(state, Msg::NextClicked);

    let (state, effects) = update(state, Msg::ResetRequested);
    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.step_number, 1);
    assert!(view.completed_steps.is_empty());
    assert!(view.source_url.is_none());
}
