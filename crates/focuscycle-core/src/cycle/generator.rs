//! Phase generation.
//!
//! Splits an estimated task duration into full-length focus phases separated
//! by breaks, with a long break after every Nth focus phase. Whatever does not
//! fill a full focus phase becomes a shorter tail focus phase, provided it is
//! at least `min_focus_tail_minutes` long.
//!
//! ```text
//! total = 60, work = 25, tail >= 10
//! [Focus 25] [Short 5] [Focus 25] [Focus 10]
//! ```
//!
//! The tail follows the last full focus phase directly and a cycle never ends
//! on a break. Output is a pure function of the inputs, so callers can preview
//! the sequence before committing to it.

use serde::{Deserialize, Serialize};

use super::phase::Phase;
use crate::error::ValidationError;

/// Generator inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSettings {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    /// A long break replaces the short one after every Nth focus phase.
    /// Zero disables long breaks.
    #[serde(default = "default_long_break_every")]
    pub long_break_every: u32,
    #[serde(default = "default_min_focus_tail_minutes")]
    pub min_focus_tail_minutes: u32,
}

fn default_work_minutes() -> u32 {
    25
}
fn default_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_long_break_every() -> u32 {
    4
}
fn default_min_focus_tail_minutes() -> u32 {
    10
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            long_break_every: default_long_break_every(),
            min_focus_tail_minutes: default_min_focus_tail_minutes(),
        }
    }
}

impl PhaseSettings {
    /// Reject settings that cannot produce a usable cycle.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks = [
            ("work_minutes", self.work_minutes),
            ("break_minutes", self.break_minutes),
            ("long_break_minutes", self.long_break_minutes),
            ("min_focus_tail_minutes", self.min_focus_tail_minutes),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ValidationError::InvalidValue {
                    field: field.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    fn break_after(&self, focus_ordinal: u32) -> Phase {
        if self.long_break_every > 0 && focus_ordinal % self.long_break_every == 0 {
            Phase::long_break(self.long_break_minutes)
        } else {
            Phase::short_break(self.break_minutes)
        }
    }
}

/// Build the ordered phase sequence for `total_minutes` of estimated work.
///
/// Returns an empty sequence when `total_minutes < min_focus_tail_minutes`
/// (or when `work_minutes` is zero); callers treat that as "cannot start".
pub fn generate_phases(total_minutes: u32, settings: &PhaseSettings) -> Vec<Phase> {
    if settings.work_minutes == 0 || total_minutes < settings.min_focus_tail_minutes {
        return Vec::new();
    }

    let full_sessions = total_minutes / settings.work_minutes;
    let tail_minutes = total_minutes % settings.work_minutes;

    let mut phases = Vec::with_capacity(full_sessions as usize * 2 + 1);
    for ordinal in 1..=full_sessions {
        if ordinal > 1 {
            phases.push(settings.break_after(ordinal - 1));
        }
        phases.push(Phase::focus(settings.work_minutes, ordinal));
    }

    if tail_minutes > 0 && tail_minutes >= settings.min_focus_tail_minutes {
        phases.push(Phase::focus(tail_minutes, full_sessions + 1));
    }

    phases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::PhaseType;
    use proptest::prelude::*;

    fn settings() -> PhaseSettings {
        PhaseSettings {
            work_minutes: 25,
            break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
            min_focus_tail_minutes: 10,
        }
    }

    fn kinds(phases: &[Phase]) -> Vec<(PhaseType, u32)> {
        phases
            .iter()
            .map(|p| (p.phase_type, p.duration_min()))
            .collect()
    }

    #[test]
    fn sixty_minutes_gets_tail_without_trailing_break() {
        let phases = generate_phases(60, &settings());
        assert_eq!(
            kinds(&phases),
            vec![
                (PhaseType::Focus, 25),
                (PhaseType::ShortBreak, 5),
                (PhaseType::Focus, 25),
                (PhaseType::Focus, 10),
            ]
        );
        let ordinals: Vec<u32> = phases.iter().map(|p| p.focus_session_index).collect();
        assert_eq!(ordinals, vec![1, 0, 2, 3]);
    }

    #[test]
    fn short_remainder_is_dropped() {
        let phases = generate_phases(55, &settings());
        assert_eq!(
            kinds(&phases),
            vec![
                (PhaseType::Focus, 25),
                (PhaseType::ShortBreak, 5),
                (PhaseType::Focus, 25),
            ]
        );
    }

    #[test]
    fn long_break_after_every_fourth_focus() {
        let phases = generate_phases(125, &settings());
        let breaks: Vec<PhaseType> = phases
            .iter()
            .filter(|p| p.is_break())
            .map(|p| p.phase_type)
            .collect();
        assert_eq!(
            breaks,
            vec![
                PhaseType::ShortBreak,
                PhaseType::ShortBreak,
                PhaseType::ShortBreak,
                PhaseType::LongBreak,
            ]
        );
        assert_eq!(phases.last().map(|p| p.phase_type), Some(PhaseType::Focus));
    }

    #[test]
    fn below_minimum_tail_is_empty() {
        assert!(generate_phases(9, &settings()).is_empty());
        assert!(generate_phases(0, &settings()).is_empty());
    }

    #[test]
    fn total_shorter_than_work_becomes_single_tail() {
        let phases = generate_phases(12, &settings());
        assert_eq!(kinds(&phases), vec![(PhaseType::Focus, 12)]);
        assert_eq!(phases[0].focus_session_index, 1);
    }

    #[test]
    fn zero_long_break_interval_disables_long_breaks() {
        let cfg = PhaseSettings {
            long_break_every: 0,
            ..settings()
        };
        let phases = generate_phases(250, &cfg);
        assert!(phases.iter().all(|p| p.phase_type != PhaseType::LongBreak));
    }

    #[test]
    fn zero_work_minutes_yields_nothing() {
        let cfg = PhaseSettings {
            work_minutes: 0,
            ..settings()
        };
        assert!(generate_phases(100, &cfg).is_empty());
    }

    #[test]
    fn validate_rejects_zero_durations() {
        assert!(settings().validate().is_ok());
        let err = PhaseSettings {
            break_minutes: 0,
            ..settings()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                field: "break_minutes".into(),
                message: "must be greater than zero".into(),
            }
        );
    }

    fn arb_settings() -> impl Strategy<Value = PhaseSettings> {
        (1u32..=90, 1u32..=30, 1u32..=45, 0u32..=6, 1u32..=30).prop_map(
            |(work, brk, long, every, tail)| PhaseSettings {
                work_minutes: work,
                break_minutes: brk,
                long_break_minutes: long,
                long_break_every: every,
                min_focus_tail_minutes: tail,
            },
        )
    }

    proptest! {
        #[test]
        fn full_focus_time_is_multiple_of_work(total in 0u32..600, cfg in arb_settings()) {
            let phases = generate_phases(total, &cfg);
            let full: u32 = phases
                .iter()
                .filter(|p| p.is_focus() && p.duration_min() == cfg.work_minutes)
                .map(|p| p.duration_min())
                .sum();
            prop_assert_eq!(full % cfg.work_minutes, 0);
            let focus_total: u32 = phases.iter().filter(|p| p.is_focus()).map(|p| p.duration_min()).sum();
            prop_assert!(focus_total <= total);
        }

        #[test]
        fn never_two_breaks_in_a_row_and_never_ends_on_break(total in 0u32..600, cfg in arb_settings()) {
            let phases = generate_phases(total, &cfg);
            for pair in phases.windows(2) {
                prop_assert!(!(pair[0].is_break() && pair[1].is_break()));
            }
            if let Some(last) = phases.last() {
                prop_assert!(last.is_focus());
            }
            if let Some(first) = phases.first() {
                prop_assert!(first.is_focus());
            }
        }

        #[test]
        fn empty_iff_below_minimum_tail(total in 0u32..600, cfg in arb_settings()) {
            let phases = generate_phases(total, &cfg);
            prop_assert_eq!(phases.is_empty(), total < cfg.min_focus_tail_minutes);
        }

        #[test]
        fn breaks_follow_focus_ordinals(total in 0u32..600, cfg in arb_settings()) {
            let phases = generate_phases(total, &cfg);
            for pair in phases.windows(2) {
                if pair[1].is_break() {
                    let ordinal = pair[0].focus_session_index;
                    let expect_long = cfg.long_break_every > 0 && ordinal % cfg.long_break_every == 0;
                    prop_assert_eq!(pair[1].phase_type == PhaseType::LongBreak, expect_long);
                }
            }
        }

        #[test]
        fn deterministic(total in 0u32..600, cfg in arb_settings()) {
            prop_assert_eq!(generate_phases(total, &cfg), generate_phases(total, &cfg));
        }
    }
}
