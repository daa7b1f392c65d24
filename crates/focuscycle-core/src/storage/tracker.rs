use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::Database;
use crate::cycle::{Phase, PhaseType};
use crate::error::{DatabaseError, SessionError};
use crate::session::{SessionId, SessionTracker};

/// [`SessionTracker`] that persists to a [`Database`].
///
/// SQLite calls run on the blocking pool so the engine worker never stalls
/// the runtime while a write is in progress.
#[derive(Clone)]
pub struct SqliteSessionTracker {
    db: Arc<Mutex<Database>>,
}

impl SqliteSessionTracker {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Shared handle to the underlying database, for read-side queries.
    pub fn database(&self) -> Arc<Mutex<Database>> {
        Arc::clone(&self.db)
    }

    async fn with_db<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, SessionError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| DatabaseError::Locked)?;
            f(&guard)
        })
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?
    }
}

#[async_trait]
impl SessionTracker for SqliteSessionTracker {
    async fn create_phase_session(
        &self,
        task_id: i64,
        user_id: i64,
        phase: &Phase,
    ) -> Result<SessionId, SessionError> {
        let phase = *phase;
        self.with_db(move |db| {
            db.insert_session(
                user_id,
                task_id,
                phase.phase_type,
                phase.duration_secs,
                Utc::now(),
            )
            .map_err(|e| SessionError::CreateFailed {
                task_id,
                message: e.to_string(),
            })
        })
        .await
    }

    async fn complete_phase_session(
        &self,
        session_id: SessionId,
        task_id: i64,
        _phase_type: PhaseType,
        actual_duration_secs: u32,
        interruptions: u32,
    ) -> Result<(), SessionError> {
        self.with_db(move |db| {
            let record = db
                .get_session(session_id)?
                .ok_or(SessionError::NotFound(session_id))?;
            if record.task_id != task_id {
                return Err(SessionError::TaskMismatch {
                    session_id,
                    expected: task_id,
                    actual: record.task_id,
                });
            }
            db.complete_session(session_id, actual_duration_secs, interruptions, Utc::now())
                .map_err(|e| SessionError::CompleteFailed {
                    session_id,
                    message: e.to_string(),
                })?;
            Ok(())
        })
        .await
    }
}
