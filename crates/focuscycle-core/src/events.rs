use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::PhaseType;
use crate::session::SessionId;

/// Every transition the cycle engine makes produces an Event.
/// Hosts log them, render them, or ignore them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CycleStarted {
        task_id: i64,
        user_id: i64,
        phase_count: usize,
        at: DateTime<Utc>,
    },
    PhaseStarted {
        index: usize,
        phase_type: PhaseType,
        duration_secs: u32,
        session_id: SessionId,
        at: DateTime<Utc>,
    },
    PhasePaused {
        index: usize,
        remaining_secs: u32,
        interruptions: u32,
        at: DateTime<Utc>,
    },
    PhaseResumed {
        index: usize,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    /// A phase's session record was finalized.
    PhaseCompleted {
        index: usize,
        phase_type: PhaseType,
        session_id: SessionId,
        actual_duration_secs: u32,
        interruptions: u32,
        outcome: PhaseOutcome,
        at: DateTime<Utc>,
    },
    BreakSkipped {
        from_index: usize,
        to_index: Option<usize>,
        at: DateTime<Utc>,
    },
    /// The last phase was confirmed.
    CycleFinished {
        task_id: i64,
        at: DateTime<Utc>,
    },
    CycleStopped {
        task_id: i64,
        saved: bool,
        at: DateTime<Utc>,
    },
    /// The cycle ended because a session record could not be written.
    CycleAborted {
        task_id: i64,
        reason: String,
        at: DateTime<Utc>,
    },
}

/// How a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    Elapsed,
    Skipped,
    Stopped,
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::CycleStarted { at, .. }
            | Event::PhaseStarted { at, .. }
            | Event::PhasePaused { at, .. }
            | Event::PhaseResumed { at, .. }
            | Event::PhaseCompleted { at, .. }
            | Event::BreakSkipped { at, .. }
            | Event::CycleFinished { at, .. }
            | Event::CycleStopped { at, .. }
            | Event::CycleAborted { at, .. } => *at,
        }
    }

    /// Whether this event ends the cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::CycleFinished { .. } | Event::CycleStopped { .. } | Event::CycleAborted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::PhaseCompleted {
            index: 2,
            phase_type: PhaseType::ShortBreak,
            session_id: SessionId::new(7),
            actual_duration_secs: 42,
            interruptions: 1,
            outcome: PhaseOutcome::Skipped,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PhaseCompleted");
        assert_eq!(json["session_id"], 7);
        assert_eq!(json["outcome"], "skipped");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn terminal_events() {
        let at = Utc::now();
        assert!(Event::CycleFinished { task_id: 1, at }.is_terminal());
        assert!(!Event::PhaseResumed {
            index: 0,
            remaining_secs: 3,
            at
        }
        .is_terminal());
    }
}
