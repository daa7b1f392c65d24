use serde::{Deserialize, Serialize};

use super::state::TimerState;
use crate::cycle::Phase;

/// A user action a host can offer (notification buttons, key bindings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineAction {
    Pause,
    Resume,
    Confirm,
    SkipBreak,
    Stop,
}

impl EngineAction {
    pub fn label(self) -> &'static str {
        match self {
            EngineAction::Pause => "Pause",
            EngineAction::Resume => "Resume",
            EngineAction::Confirm => "Continue",
            EngineAction::SkipBreak => "Skip break",
            EngineAction::Stop => "Stop",
        }
    }
}

/// Actions that are valid for `state`, given the current and next phase.
pub fn available_actions(
    state: &TimerState,
    current: Option<&Phase>,
    next: Option<&Phase>,
) -> Vec<EngineAction> {
    let on_break = current.is_some_and(Phase::is_break);
    let mut actions = Vec::with_capacity(3);
    match state {
        TimerState::Idle => {}
        TimerState::Running { .. } => {
            if on_break {
                actions.push(EngineAction::SkipBreak);
            }
            actions.push(EngineAction::Pause);
            actions.push(EngineAction::Stop);
        }
        TimerState::Paused { .. } => {
            if on_break {
                actions.push(EngineAction::SkipBreak);
            }
            actions.push(EngineAction::Resume);
            actions.push(EngineAction::Stop);
        }
        TimerState::WaitingForConfirmation { .. } => {
            actions.push(EngineAction::Confirm);
            if next.is_some_and(Phase::is_break) {
                actions.push(EngineAction::SkipBreak);
            }
            actions.push(EngineAction::Stop);
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::PhaseType;

    fn running(phase_type: PhaseType) -> TimerState {
        TimerState::Running {
            remaining_secs: 10,
            total_secs: 10,
            phase_type,
            interruptions: 0,
        }
    }

    #[test]
    fn idle_offers_nothing() {
        assert!(available_actions(&TimerState::Idle, None, None).is_empty());
    }

    #[test]
    fn break_offers_skip() {
        let current = Phase::short_break(5);
        let actions = available_actions(&running(PhaseType::ShortBreak), Some(&current), None);
        assert_eq!(
            actions,
            vec![EngineAction::SkipBreak, EngineAction::Pause, EngineAction::Stop]
        );

        let focus = Phase::focus(25, 1);
        let actions = available_actions(&running(PhaseType::Focus), Some(&focus), None);
        assert_eq!(actions, vec![EngineAction::Pause, EngineAction::Stop]);
    }

    #[test]
    fn waiting_before_break_offers_skip() {
        let state = TimerState::WaitingForConfirmation {
            phase_type: PhaseType::Focus,
            total_secs: 1500,
            interruptions: 0,
        };
        let focus = Phase::focus(25, 1);
        let brk = Phase::long_break(15);
        assert_eq!(
            available_actions(&state, Some(&focus), Some(&brk)),
            vec![EngineAction::Confirm, EngineAction::SkipBreak, EngineAction::Stop]
        );
        assert_eq!(
            available_actions(&state, Some(&focus), None),
            vec![EngineAction::Confirm, EngineAction::Stop]
        );
    }
}
