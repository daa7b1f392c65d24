mod generator;
mod phase;

pub use generator::{generate_phases, PhaseSettings};
pub use phase::{focus_count, total_duration_secs, total_focus_seconds, Phase, PhaseType};
