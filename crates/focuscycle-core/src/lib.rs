//! # FocusCycle Core Library
//!
//! This library provides the core logic for the FocusCycle work/break interval
//! timer. All operations are available via the standalone CLI binary; any other
//! host (tray app, mobile shell) is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Cycle generation**: a pure function that splits a task estimate into
//!   focus phases and breaks
//! - **Timer state machine**: the closed set of timer states and the only
//!   transitions allowed between them
//! - **Cycle engine**: a single tokio worker that serializes commands and
//!   countdown ticks, persists a session per phase through a
//!   [`SessionTracker`], and publishes replay-latest outputs
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`generate_phases`]: phase sequence for a task estimate
//! - [`CycleEngine`]: handle to the running engine
//! - [`TimerState`]: what the timer is doing right now
//! - [`Database`] / [`SqliteSessionTracker`]: session persistence
//! - [`Config`]: application configuration management

pub mod cycle;
pub mod error;
pub mod events;
pub mod feedback;
pub mod session;
pub mod settings;
pub mod storage;
pub mod timer;

pub use cycle::{generate_phases, Phase, PhaseSettings, PhaseType};
pub use error::{
    ConfigError, CoreError, DatabaseError, EngineError, Result, SessionError, ValidationError,
};
pub use events::{Event, PhaseOutcome};
pub use feedback::{CompletionFeedback, CompletionSignal, NoopFeedback};
pub use session::{
    complete_interrupted_phase, InMemorySessionTracker, SessionId, SessionRecord, SessionTracker,
};
pub use settings::{CycleSettings, SettingsSource};
pub use storage::{Config, Database, SqliteSessionTracker, TaskSessionStats};
pub use timer::{
    available_actions, CycleEngine, EngineAction, EngineConfig, InterruptedPhaseInfo,
    Subscription, TimerState,
};
