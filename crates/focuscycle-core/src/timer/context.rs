use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::cycle::PhaseType;
use crate::session::SessionId;

/// Snapshot of a phase that is running or paused, enough to finalize its
/// session record without the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptedPhaseInfo {
    pub session_id: SessionId,
    pub phase_type: PhaseType,
    pub phase_start_time: DateTime<Utc>,
    pub interruption_count: u32,
}

/// The session record backing the phase in flight.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ActiveSession {
    pub session_id: SessionId,
    pub started_at: DateTime<Utc>,
    started: Instant,
}

impl ActiveSession {
    /// Whole seconds since the phase started, paused time included.
    pub fn elapsed_secs(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_secs()).unwrap_or(u32::MAX)
    }
}

/// Per-cycle bookkeeping owned by the engine worker.
#[derive(Debug, Clone)]
pub(crate) struct CycleContext {
    pub task_id: i64,
    pub user_id: i64,
    session: Option<ActiveSession>,
}

impl CycleContext {
    pub fn new(task_id: i64, user_id: i64) -> Self {
        Self {
            task_id,
            user_id,
            session: None,
        }
    }

    pub fn open_session(&mut self, session_id: SessionId) -> ActiveSession {
        let session = ActiveSession {
            session_id,
            started_at: Utc::now(),
            started: Instant::now(),
        };
        self.session = Some(session);
        session
    }

    pub fn session(&self) -> Option<ActiveSession> {
        self.session
    }

    pub fn close_session(&mut self) -> Option<ActiveSession> {
        self.session.take()
    }

    pub fn interrupted_info(
        &self,
        phase_type: PhaseType,
        interruption_count: u32,
    ) -> Option<InterruptedPhaseInfo> {
        self.session.map(|s| InterruptedPhaseInfo {
            session_id: s.session_id,
            phase_type,
            phase_start_time: s.started_at,
            interruption_count,
        })
    }
}
