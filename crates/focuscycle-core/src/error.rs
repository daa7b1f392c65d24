//! Core error types for focuscycle-core.
//!
//! The engine itself never surfaces errors for rejected commands; these types
//! cover the collaborators around it (session tracking, storage, config) and
//! the handful of engine failures a caller can observe.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionId;

/// Core error type for focuscycle-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session tracking errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Engine command channel errors
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a [`SessionTracker`](crate::session::SessionTracker).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The tracker could not create a record for a phase about to run
    #[error("Failed to create session for task {task_id}: {message}")]
    CreateFailed { task_id: i64, message: String },

    /// The tracker could not finalize a phase record
    #[error("Failed to complete session {session_id}: {message}")]
    CompleteFailed {
        session_id: SessionId,
        message: String,
    },

    /// No record exists for the given id
    #[error("Session {0} not found")]
    NotFound(SessionId),

    /// The record belongs to a different task
    #[error("Session {session_id} belongs to task {actual}, not {expected}")]
    TaskMismatch {
        session_id: SessionId,
        expected: i64,
        actual: i64,
    },

    /// The backing store failed
    #[error("Session storage failure: {0}")]
    Storage(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored value could not be decoded
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not resolve the data directory
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors a caller can observe when talking to a [`CycleEngine`](crate::timer::CycleEngine).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The worker has exited; no further commands are accepted
    #[error("cycle engine has shut down")]
    ShutDown,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked
                    || err.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<DatabaseError> for SessionError {
    fn from(err: DatabaseError) -> Self {
        SessionError::Storage(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
