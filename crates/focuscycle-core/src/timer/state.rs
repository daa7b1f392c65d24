//! Timer state and the transition table.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |          |
//!           v          |
//!   WaitingForConfirmation -> Running(next) | Idle
//! ```
//!
//! [`TimerStateMachine`] only validates and applies transitions. Side effects
//! (session records, the countdown task, observers) belong to the engine,
//! which asks the machine first and acts only on `Ok`.

use serde::{Deserialize, Serialize};

use crate::cycle::{Phase, PhaseType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TimerState {
    #[default]
    Idle,
    Running {
        remaining_secs: u32,
        total_secs: u32,
        phase_type: PhaseType,
        interruptions: u32,
    },
    Paused {
        remaining_secs: u32,
        total_secs: u32,
        phase_type: PhaseType,
        interruptions: u32,
    },
    /// Phase finished; the cycle is blocked until the caller confirms.
    WaitingForConfirmation {
        phase_type: PhaseType,
        total_secs: u32,
        interruptions: u32,
    },
}

impl TimerState {
    pub fn kind(&self) -> StateKind {
        match self {
            TimerState::Idle => StateKind::Idle,
            TimerState::Running { .. } => StateKind::Running,
            TimerState::Paused { .. } => StateKind::Paused,
            TimerState::WaitingForConfirmation { .. } => StateKind::WaitingForConfirmation,
        }
    }

    /// Whether a cycle is in progress. Hosts stay alive while this holds.
    pub fn is_active(&self) -> bool {
        !matches!(self, TimerState::Idle)
    }

    pub fn phase_type(&self) -> Option<PhaseType> {
        match *self {
            TimerState::Idle => None,
            TimerState::Running { phase_type, .. }
            | TimerState::Paused { phase_type, .. }
            | TimerState::WaitingForConfirmation { phase_type, .. } => Some(phase_type),
        }
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        match *self {
            TimerState::Running { remaining_secs, .. }
            | TimerState::Paused { remaining_secs, .. } => Some(remaining_secs),
            TimerState::WaitingForConfirmation { .. } => Some(0),
            TimerState::Idle => None,
        }
    }

    pub fn total_secs(&self) -> Option<u32> {
        match *self {
            TimerState::Idle => None,
            TimerState::Running { total_secs, .. }
            | TimerState::Paused { total_secs, .. }
            | TimerState::WaitingForConfirmation { total_secs, .. } => Some(total_secs),
        }
    }

    pub fn interruptions(&self) -> u32 {
        match *self {
            TimerState::Idle => 0,
            TimerState::Running { interruptions, .. }
            | TimerState::Paused { interruptions, .. }
            | TimerState::WaitingForConfirmation { interruptions, .. } => interruptions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Running,
    Paused,
    WaitingForConfirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Pause,
    Resume,
    Tick,
    Confirm,
    SkipBreak,
    Stop,
}

/// A command that does not apply in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub command: CommandKind,
    pub from: StateKind,
}

impl std::fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} is not valid from {:?}", self.command, self.from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One second consumed; the phase is still running.
    Counting(TimerState),
    /// The phase reached zero.
    Expired(TimerState),
}

/// What a valid skip-break command has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipPlan {
    /// The current phase is a break still in progress and must be finalized.
    pub finalize_current: bool,
    /// Index of the focus phase to start next; `None` ends the cycle.
    pub next_focus: Option<usize>,
}

/// Current state plus the active phase sequence and index.
#[derive(Debug, Clone, Default)]
pub struct TimerStateMachine {
    state: TimerState,
    phases: Vec<Phase>,
    index: Option<usize>,
}

impl TimerStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn current_index(&self) -> Option<usize> {
        self.index
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.index.and_then(|i| self.phases.get(i))
    }

    pub fn phase_at(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    /// First focus phase strictly after `index`.
    pub fn next_focus_after(&self, index: usize) -> Option<usize> {
        self.phases
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, p)| p.is_focus())
            .map(|(i, _)| i)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Accept a new cycle. The state stays `Idle` until the first phase is
    /// entered.
    pub fn load_cycle(&mut self, phases: Vec<Phase>) -> Result<(), InvalidTransition> {
        if self.state.is_active() || phases.is_empty() {
            return Err(self.reject(CommandKind::Start));
        }
        self.phases = phases;
        self.index = None;
        Ok(())
    }

    /// Make `index` the running phase with a fresh countdown.
    pub fn enter_phase(&mut self, index: usize) -> Option<TimerState> {
        let phase = *self.phases.get(index)?;
        self.index = Some(index);
        self.state = TimerState::Running {
            remaining_secs: phase.duration_secs,
            total_secs: phase.duration_secs,
            phase_type: phase.phase_type,
            interruptions: 0,
        };
        Some(self.state)
    }

    pub fn pause(&mut self) -> Result<TimerState, InvalidTransition> {
        match self.state {
            TimerState::Running {
                remaining_secs,
                total_secs,
                phase_type,
                interruptions,
            } => {
                self.state = TimerState::Paused {
                    remaining_secs,
                    total_secs,
                    phase_type,
                    interruptions: interruptions.saturating_add(1),
                };
                Ok(self.state)
            }
            _ => Err(self.reject(CommandKind::Pause)),
        }
    }

    pub fn resume(&mut self) -> Result<TimerState, InvalidTransition> {
        match self.state {
            TimerState::Paused {
                remaining_secs,
                total_secs,
                phase_type,
                interruptions,
            } => {
                self.state = TimerState::Running {
                    remaining_secs,
                    total_secs,
                    phase_type,
                    interruptions,
                };
                Ok(self.state)
            }
            _ => Err(self.reject(CommandKind::Resume)),
        }
    }

    pub fn tick(&mut self) -> Result<TickOutcome, InvalidTransition> {
        match &mut self.state {
            TimerState::Running { remaining_secs, .. } => {
                *remaining_secs = remaining_secs.saturating_sub(1);
                if *remaining_secs == 0 {
                    Ok(TickOutcome::Expired(self.state))
                } else {
                    Ok(TickOutcome::Counting(self.state))
                }
            }
            _ => Err(self.reject(CommandKind::Tick)),
        }
    }

    /// Block the cycle on the phase that just finished.
    pub fn complete_phase(&mut self) -> Option<TimerState> {
        match self.state {
            TimerState::Running {
                total_secs,
                phase_type,
                interruptions,
                ..
            }
            | TimerState::Paused {
                total_secs,
                phase_type,
                interruptions,
                ..
            } => {
                self.state = TimerState::WaitingForConfirmation {
                    phase_type,
                    total_secs,
                    interruptions,
                };
                Some(self.state)
            }
            TimerState::Idle | TimerState::WaitingForConfirmation { .. } => None,
        }
    }

    /// Index to start after a confirmation; `Ok(None)` means the cycle is done.
    pub fn confirm_target(&self) -> Result<Option<usize>, InvalidTransition> {
        match (self.state, self.index) {
            (TimerState::WaitingForConfirmation { .. }, Some(index)) => {
                let next = index + 1;
                Ok((next < self.phases.len()).then_some(next))
            }
            _ => Err(self.reject(CommandKind::Confirm)),
        }
    }

    /// Validate a skip-break command.
    ///
    /// Running or paused, the current phase must be a break. Waiting for
    /// confirmation, either the finished phase or the upcoming one must be a
    /// break; the finished phase is already persisted.
    pub fn skip_plan(&self) -> Result<SkipPlan, InvalidTransition> {
        let rejected = Err(self.reject(CommandKind::SkipBreak));
        let Some(index) = self.index else {
            return rejected;
        };
        let Some(current) = self.phases.get(index) else {
            return rejected;
        };

        match self.state {
            TimerState::Running { .. } | TimerState::Paused { .. } if current.is_break() => {
                Ok(SkipPlan {
                    finalize_current: true,
                    next_focus: self.next_focus_after(index),
                })
            }
            TimerState::WaitingForConfirmation { .. } if current.is_break() => Ok(SkipPlan {
                finalize_current: false,
                next_focus: self.next_focus_after(index),
            }),
            TimerState::WaitingForConfirmation { .. }
                if self.phases.get(index + 1).is_some_and(Phase::is_break) =>
            {
                Ok(SkipPlan {
                    finalize_current: false,
                    next_focus: self.next_focus_after(index + 1),
                })
            }
            _ => rejected,
        }
    }

    /// Validate a stop. `Ok(true)` when a phase is mid-flight (running or
    /// paused) and could have its progress saved.
    pub fn stop_plan(&self) -> Result<bool, InvalidTransition> {
        match self.state {
            TimerState::Idle => Err(self.reject(CommandKind::Stop)),
            TimerState::Running { .. } | TimerState::Paused { .. } => Ok(true),
            TimerState::WaitingForConfirmation { .. } => Ok(false),
        }
    }

    /// Drop the cycle and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.phases.clear();
        self.index = None;
    }

    fn reject(&self, command: CommandKind) -> InvalidTransition {
        InvalidTransition {
            command,
            from: self.state.kind(),
        }
    }
}
