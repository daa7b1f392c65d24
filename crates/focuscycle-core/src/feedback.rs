//! Completion feedback seam.
//!
//! When a phase finishes the engine asks an audio/haptic collaborator to
//! signal it. The call is fire-and-forget: the engine never waits on playback
//! and never learns whether it worked.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::cycle::PhaseType;
use crate::settings::CycleSettings;

/// What to play when a phase completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionSignal {
    pub phase_type: PhaseType,
    pub sound: Option<String>,
    pub vibrate: bool,
}

impl CompletionSignal {
    pub fn from_settings(phase_type: PhaseType, settings: &CycleSettings) -> Self {
        Self {
            phase_type,
            sound: settings.sound_for(phase_type).map(str::to_string),
            vibrate: settings.vibration_enabled,
        }
    }
}

pub trait CompletionFeedback: Send + Sync {
    /// Start the completion signal. Must not block.
    fn play_completion(&self, signal: &CompletionSignal);

    /// Silence any signal still playing.
    fn stop(&self);
}

/// Feedback that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedback;

impl CompletionFeedback for NoopFeedback {
    fn play_completion(&self, _signal: &CompletionSignal) {}

    fn stop(&self) {}
}

/// Feedback that remembers every call, for assertions.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    calls: Mutex<Vec<FeedbackCall>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackCall {
    Play(CompletionSignal),
    Stop,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FeedbackCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn played(&self) -> Vec<CompletionSignal> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FeedbackCall::Play(signal) => Some(signal),
                FeedbackCall::Stop => None,
            })
            .collect()
    }

    fn push(&self, call: FeedbackCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl CompletionFeedback for RecordingFeedback {
    fn play_completion(&self, signal: &CompletionSignal) {
        self.push(FeedbackCall::Play(signal.clone()));
    }

    fn stop(&self) {
        self.push(FeedbackCall::Stop);
    }
}
