//! Live cycle settings.
//!
//! Hosts own a [`SettingsSource`] and push updates into it; the engine holds a
//! receiver and reads the latest snapshot whenever it needs one (currently only
//! to pick the completion signal). Reading never waits for the host.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cycle::{PhaseSettings, PhaseType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSettings {
    #[serde(default)]
    pub phases: PhaseSettings,
    /// Sound played when a focus phase completes.
    #[serde(default)]
    pub focus_sound: Option<String>,
    /// Sound played when a break completes.
    #[serde(default)]
    pub break_sound: Option<String>,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            phases: PhaseSettings::default(),
            focus_sound: None,
            break_sound: None,
            vibration_enabled: true,
        }
    }
}

impl CycleSettings {
    /// The sound reference for a phase that just finished.
    pub fn sound_for(&self, phase_type: PhaseType) -> Option<&str> {
        let sound = if phase_type.is_focus() {
            self.focus_sound.as_deref()
        } else {
            self.break_sound.as_deref()
        };
        sound.filter(|s| !s.is_empty())
    }
}

/// Observable settings owned by the host.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    tx: watch::Sender<CycleSettings>,
}

impl SettingsSource {
    pub fn new(initial: CycleSettings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current settings. Subscribers see the new value on their
    /// next read.
    pub fn update(&self, settings: CycleSettings) {
        self.tx.send_replace(settings);
    }

    pub fn current(&self) -> CycleSettings {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CycleSettings> {
        self.tx.subscribe()
    }
}

impl Default for SettingsSource {
    fn default() -> Self {
        Self::new(CycleSettings::default())
    }
}
