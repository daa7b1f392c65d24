use std::io::Write;

use focuscycle_core::{CompletionFeedback, CompletionSignal};
use tracing::debug;

/// Completion feedback for a terminal: rings the bell on stderr.
///
/// A terminal cannot play sound files or vibrate, so those parts of the
/// signal are only logged.
pub struct TerminalBell {
    enabled: bool,
}

impl TerminalBell {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl CompletionFeedback for TerminalBell {
    fn play_completion(&self, signal: &CompletionSignal) {
        debug!(
            phase_type = %signal.phase_type,
            sound = ?signal.sound,
            vibrate = signal.vibrate,
            "completion signal"
        );
        if self.enabled {
            let mut stderr = std::io::stderr();
            let _ = stderr.write_all(b"\x07");
            let _ = stderr.flush();
        }
    }

    fn stop(&self) {}
}
