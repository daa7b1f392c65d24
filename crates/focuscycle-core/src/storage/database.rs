//! SQLite-based phase session storage and statistics.
//!
//! One row per phase the engine starts. Rows are inserted incomplete and
//! updated once the phase is finalized.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{data_dir, migrations};
use crate::cycle::PhaseType;
use crate::error::{CoreError, DatabaseError};
use crate::session::{SessionId, SessionRecord};

/// Focus phases shorter than this do not count as completed sessions.
pub const MIN_REWARDED_FOCUS_SECS: u32 = 10 * 60;

/// Per-task totals over completed phase sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TaskSessionStats {
    pub task_id: i64,
    pub total_sessions: u64,
    /// Focus phases with at least [`MIN_REWARDED_FOCUS_SECS`] of actual time.
    pub completed_focus_sessions: u64,
    pub focus_secs: u64,
    pub break_secs: u64,
    pub interruptions: u64,
}

/// SQLite database for phase sessions.
pub struct Database {
    conn: Connection,
}

const SESSION_COLUMNS: &str = "id, user_id, task_id, start_time, session_type, \
     planned_duration_secs, actual_duration_secs, interruptions, completed";

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/focuscycle/focuscycle.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("focuscycle.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert an incomplete session for a phase about to run.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_session(
        &self,
        user_id: i64,
        task_id: i64,
        session_type: PhaseType,
        planned_duration_secs: u32,
        start_time: DateTime<Utc>,
    ) -> Result<SessionId, DatabaseError> {
        self.conn.execute(
            "INSERT INTO pomodoro_sessions (user_id, task_id, start_time, session_type, planned_duration_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                task_id,
                timestamp(start_time),
                session_type.as_str(),
                planned_duration_secs,
            ],
        )?;
        Ok(SessionId::new(self.conn.last_insert_rowid()))
    }

    /// Record the outcome of a session. Returns `false` if no row matched.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub fn complete_session(
        &self,
        id: SessionId,
        actual_duration_secs: u32,
        interruptions: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE pomodoro_sessions
             SET actual_duration_secs = ?2, interruptions = ?3, completed = 1, completed_at = ?4
             WHERE id = ?1",
            params![
                id.get(),
                actual_duration_secs,
                interruptions,
                timestamp(completed_at),
            ],
        )?;
        Ok(changed > 0)
    }

    /// # Errors
    /// Returns an error if the query fails or the row cannot be decoded.
    pub fn get_session(&self, id: SessionId) -> Result<Option<SessionRecord>, DatabaseError> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM pomodoro_sessions WHERE id = ?1"),
                params![id.get()],
                RawSession::from_row,
            )
            .optional()?;
        raw.map(RawSession::decode).transpose()
    }

    /// Most recent sessions first, optionally for one task.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn list_sessions(
        &self,
        task_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, DatabaseError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM pomodoro_sessions
             WHERE ?1 IS NULL OR task_id = ?1
             ORDER BY start_time DESC, id DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![task_id, limit], RawSession::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.decode()?);
        }
        Ok(records)
    }

    /// Totals over the completed sessions of one task.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub fn task_stats(&self, task_id: i64) -> Result<TaskSessionStats, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_type,
                    COUNT(*),
                    COALESCE(SUM(actual_duration_secs), 0),
                    COALESCE(SUM(interruptions), 0),
                    COALESCE(SUM(actual_duration_secs >= ?2), 0)
             FROM pomodoro_sessions
             WHERE task_id = ?1 AND completed = 1
             GROUP BY session_type",
        )?;

        let mut stats = TaskSessionStats {
            task_id,
            ..TaskSessionStats::default()
        };
        let rows = stmt.query_map(params![task_id, MIN_REWARDED_FOCUS_SECS], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, u64>(4)?,
            ))
        })?;

        for row in rows {
            let (session_type, count, secs, interruptions, rewarded) = row?;
            stats.total_sessions += count;
            stats.interruptions += interruptions;
            match PhaseType::parse(&session_type) {
                Some(PhaseType::Focus) => {
                    stats.focus_secs += secs;
                    stats.completed_focus_sessions += rewarded;
                }
                Some(PhaseType::ShortBreak | PhaseType::LongBreak) => stats.break_secs += secs,
                None => {}
            }
        }
        Ok(stats)
    }
}

/// Fixed-width UTC timestamps so text order matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A row as stored, before enum and timestamp decoding.
struct RawSession {
    id: i64,
    user_id: i64,
    task_id: i64,
    start_time: String,
    session_type: String,
    planned_duration_secs: u32,
    actual_duration_secs: u32,
    interruptions: u32,
    completed: bool,
}

impl RawSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            task_id: row.get(2)?,
            start_time: row.get(3)?,
            session_type: row.get(4)?,
            planned_duration_secs: row.get(5)?,
            actual_duration_secs: row.get(6)?,
            interruptions: row.get(7)?,
            completed: row.get(8)?,
        })
    }

    fn decode(self) -> Result<SessionRecord, DatabaseError> {
        let corrupt = |message: String| DatabaseError::CorruptRow {
            table: "pomodoro_sessions".into(),
            message,
        };
        let session_type = PhaseType::parse(&self.session_type)
            .ok_or_else(|| corrupt(format!("unknown session_type '{}'", self.session_type)))?;
        let start_time = DateTime::parse_from_rfc3339(&self.start_time)
            .map_err(|e| corrupt(format!("bad start_time '{}': {e}", self.start_time)))?
            .with_timezone(&Utc);

        Ok(SessionRecord {
            id: SessionId::new(self.id),
            user_id: self.user_id,
            task_id: self.task_id,
            start_time,
            session_type,
            planned_duration_secs: self.planned_duration_secs,
            actual_duration_secs: self.actual_duration_secs,
            interruptions: self.interruptions,
            completed: self.completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn insert(db: &Database, task_id: i64, session_type: PhaseType, at: DateTime<Utc>) -> SessionId {
        db.insert_session(1, task_id, session_type, 1500, at).unwrap()
    }

    #[test]
    fn insert_then_complete() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let id = insert(&db, 7, PhaseType::Focus, now);

        let record = db.get_session(id).unwrap().unwrap();
        assert!(!record.completed);
        assert_eq!(record.session_type, PhaseType::Focus);
        assert_eq!(record.planned_duration_secs, 1500);

        assert!(db.complete_session(id, 1490, 2, now).unwrap());
        let record = db.get_session(id).unwrap().unwrap();
        assert!(record.completed);
        assert_eq!(record.actual_duration_secs, 1490);
        assert_eq!(record.interruptions, 2);
    }

    #[test]
    fn complete_unknown_session_reports_no_match() {
        let db = Database::open_memory().unwrap();
        assert!(!db
            .complete_session(SessionId::new(42), 10, 0, Utc::now())
            .unwrap());
        assert!(db.get_session(SessionId::new(42)).unwrap().is_none());
    }

    #[test]
    fn list_is_newest_first_and_filters_by_task() {
        let db = Database::open_memory().unwrap();
        let t0 = Utc::now();
        let a = insert(&db, 1, PhaseType::Focus, t0);
        let b = insert(&db, 2, PhaseType::Focus, t0 + Duration::minutes(30));
        let c = insert(&db, 1, PhaseType::ShortBreak, t0 + Duration::minutes(25));

        let all: Vec<_> = db.list_sessions(None, 10).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(all, vec![b, c, a]);

        let task1: Vec<_> = db.list_sessions(Some(1), 10).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(task1, vec![c, a]);

        assert_eq!(db.list_sessions(None, 1).unwrap().len(), 1);
    }

    #[test]
    fn stats_count_only_long_enough_focus() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let long = insert(&db, 3, PhaseType::Focus, now);
        let short = insert(&db, 3, PhaseType::Focus, now);
        let brk = insert(&db, 3, PhaseType::ShortBreak, now);
        let _open = insert(&db, 3, PhaseType::Focus, now);
        db.complete_session(long, 1500, 1, now).unwrap();
        db.complete_session(short, 300, 2, now).unwrap();
        db.complete_session(brk, 240, 0, now).unwrap();

        let stats = db.task_stats(3).unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.completed_focus_sessions, 1);
        assert_eq!(stats.focus_secs, 1800);
        assert_eq!(stats.break_secs, 240);
        assert_eq!(stats.interruptions, 3);

        assert_eq!(db.task_stats(99).unwrap().total_sessions, 0);
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let db = Database::open_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO pomodoro_sessions (user_id, task_id, start_time, session_type, planned_duration_secs)
                 VALUES (1, 1, 'yesterday', 'focus', 60)",
                [],
            )
            .unwrap();
        let err = db.list_sessions(None, 10).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow { .. }));
    }
}
