use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::{SessionId, SessionRecord, SessionTracker};
use crate::cycle::{Phase, PhaseType};
use crate::error::SessionError;

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<SessionId, SessionRecord>,
}

/// Session tracker backed by a map in memory.
///
/// Used by previews and tests. Failures can be scripted per call so tests can
/// exercise the engine's abort paths.
#[derive(Debug, Default)]
pub struct InMemorySessionTracker {
    inner: Mutex<Inner>,
    failing_creates: AtomicUsize,
    failing_completes: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemorySessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make the next `count` creates fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.failing_creates.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` completes fail.
    pub fn fail_next_completes(&self, count: usize) {
        self.failing_completes.store(count, Ordering::SeqCst);
    }

    pub fn get(&self, id: SessionId) -> Option<SessionRecord> {
        self.lock().records.get(&id).cloned()
    }

    /// All records in creation order.
    pub fn records(&self) -> Vec<SessionRecord> {
        self.lock().records.values().cloned().collect()
    }

    pub fn completed(&self) -> Vec<SessionRecord> {
        self.records().into_iter().filter(|r| r.completed).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl SessionTracker for InMemorySessionTracker {
    async fn create_phase_session(
        &self,
        task_id: i64,
        user_id: i64,
        phase: &Phase,
    ) -> Result<SessionId, SessionError> {
        self.simulate_latency().await;
        if Self::take_failure(&self.failing_creates) {
            return Err(SessionError::CreateFailed {
                task_id,
                message: "scripted failure".into(),
            });
        }

        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SessionId::new(inner.next_id);
        inner.records.insert(
            id,
            SessionRecord {
                id,
                user_id,
                task_id,
                start_time: Utc::now(),
                session_type: phase.phase_type,
                planned_duration_secs: phase.duration_secs,
                actual_duration_secs: 0,
                interruptions: 0,
                completed: false,
            },
        );
        Ok(id)
    }

    async fn complete_phase_session(
        &self,
        session_id: SessionId,
        task_id: i64,
        _phase_type: PhaseType,
        actual_duration_secs: u32,
        interruptions: u32,
    ) -> Result<(), SessionError> {
        self.simulate_latency().await;
        if Self::take_failure(&self.failing_completes) {
            return Err(SessionError::CompleteFailed {
                session_id,
                message: "scripted failure".into(),
            });
        }

        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        if record.task_id != task_id {
            return Err(SessionError::TaskMismatch {
                session_id,
                expected: task_id,
                actual: record.task_id,
            });
        }
        record.actual_duration_secs = actual_duration_secs;
        record.interruptions = interruptions;
        record.completed = true;
        Ok(())
    }
}
