use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl PhaseType {
    pub fn is_focus(self) -> bool {
        self == PhaseType::Focus
    }

    pub fn is_break(self) -> bool {
        matches!(self, PhaseType::ShortBreak | PhaseType::LongBreak)
    }

    /// Stable lowercase name, used for storage and display.
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseType::Focus => "focus",
            PhaseType::ShortBreak => "short_break",
            PhaseType::LongBreak => "long_break",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "focus" => Some(PhaseType::Focus),
            "short_break" => Some(PhaseType::ShortBreak),
            "long_break" => Some(PhaseType::LongBreak),
            _ => None,
        }
    }
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One timed segment of a cycle.
///
/// Phases are produced once per cycle by [`generate_phases`](super::generate_phases)
/// and are never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub phase_type: PhaseType,
    pub duration_secs: u32,
    /// 1-based ordinal among the cycle's focus phases; 0 for breaks.
    pub focus_session_index: u32,
}

impl Phase {
    pub fn focus(duration_min: u32, focus_session_index: u32) -> Self {
        Self {
            phase_type: PhaseType::Focus,
            duration_secs: duration_min.saturating_mul(60),
            focus_session_index,
        }
    }

    pub fn short_break(duration_min: u32) -> Self {
        Self {
            phase_type: PhaseType::ShortBreak,
            duration_secs: duration_min.saturating_mul(60),
            focus_session_index: 0,
        }
    }

    pub fn long_break(duration_min: u32) -> Self {
        Self {
            phase_type: PhaseType::LongBreak,
            duration_secs: duration_min.saturating_mul(60),
            focus_session_index: 0,
        }
    }

    pub fn is_focus(&self) -> bool {
        self.phase_type.is_focus()
    }

    pub fn is_break(&self) -> bool {
        self.phase_type.is_break()
    }

    pub fn duration_min(&self) -> u32 {
        self.duration_secs / 60
    }
}

/// Sum of all phase durations, in seconds.
pub fn total_duration_secs(phases: &[Phase]) -> u64 {
    phases.iter().map(|p| u64::from(p.duration_secs)).sum()
}

pub fn total_focus_seconds(phases: &[Phase]) -> u64 {
    phases
        .iter()
        .filter(|p| p.is_focus())
        .map(|p| u64::from(p.duration_secs))
        .sum()
}

pub fn focus_count(phases: &[Phase]) -> usize {
    phases.iter().filter(|p| p.is_focus()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_convert_minutes_to_seconds() {
        let focus = Phase::focus(25, 1);
        assert_eq!(focus.duration_secs, 1500);
        assert_eq!(focus.focus_session_index, 1);
        assert!(focus.is_focus());

        let long = Phase::long_break(15);
        assert_eq!(long.duration_min(), 15);
        assert_eq!(long.focus_session_index, 0);
        assert!(long.is_break());
    }

    #[test]
    fn phase_type_names_roundtrip() {
        for ty in [PhaseType::Focus, PhaseType::ShortBreak, PhaseType::LongBreak] {
            assert_eq!(PhaseType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(PhaseType::parse("nap"), None);
    }

    #[test]
    fn serializes_with_snake_case_type() {
        let json = serde_json::to_value(Phase::short_break(5)).unwrap();
        assert_eq!(json["phase_type"], "short_break");
        assert_eq!(json["duration_secs"], 300);
    }

    #[test]
    fn total_duration() {
        let phases = [Phase::focus(25, 1), Phase::short_break(5), Phase::focus(10, 2)];
        assert_eq!(total_duration_secs(&phases), (25 + 5 + 10) * 60);
        assert_eq!(total_focus_seconds(&phases), 35 * 60);
        assert_eq!(focus_count(&phases), 2);
    }
}
