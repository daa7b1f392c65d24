//! Session tracking seam.
//!
//! The engine creates one session record per phase it starts and finalizes
//! that record when the phase ends, whether naturally, by skip, or by a
//! saving stop. Storage belongs to the tracker; the engine only passes values.

mod memory;

pub use memory::InMemorySessionTracker;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{Phase, PhaseType};
use crate::error::SessionError;
use crate::timer::InterruptedPhaseInfo;

/// Opaque handle for a persisted phase session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// A persisted phase session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: i64,
    pub task_id: i64,
    pub start_time: DateTime<Utc>,
    pub session_type: PhaseType,
    pub planned_duration_secs: u32,
    pub actual_duration_secs: u32,
    pub interruptions: u32,
    pub completed: bool,
}

/// Creates and finalizes session records on behalf of the engine.
///
/// Implementations may block on I/O; the engine awaits each call before
/// publishing the resulting transition.
#[async_trait]
pub trait SessionTracker: Send + Sync {
    /// Create a record for a phase that is about to run.
    async fn create_phase_session(
        &self,
        task_id: i64,
        user_id: i64,
        phase: &Phase,
    ) -> Result<SessionId, SessionError>;

    /// Mark a record complete with what actually happened.
    async fn complete_phase_session(
        &self,
        session_id: SessionId,
        task_id: i64,
        phase_type: PhaseType,
        actual_duration_secs: u32,
        interruptions: u32,
    ) -> Result<(), SessionError>;
}

/// Finalize a phase from a snapshot taken while it was in flight.
///
/// Used by callers that complete a task mid-phase without waiting for the
/// engine to resolve the cycle. Elapsed time is measured from the snapshot's
/// start time to `now` and clamped at zero.
pub async fn complete_interrupted_phase(
    tracker: &dyn SessionTracker,
    task_id: i64,
    info: &InterruptedPhaseInfo,
    now: DateTime<Utc>,
) -> Result<u32, SessionError> {
    let elapsed = elapsed_secs(info.phase_start_time, now);
    tracker
        .complete_phase_session(
            info.session_id,
            task_id,
            info.phase_type,
            elapsed,
            info.interruption_count,
        )
        .await?;
    Ok(elapsed)
}

/// Whole seconds between two instants, clamped to `[0, u32::MAX]`.
pub fn elapsed_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let secs = (end - start).num_seconds().max(0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}
