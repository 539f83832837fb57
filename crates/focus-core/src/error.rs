use crate::types::SessionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Session {0} has not ended yet")]
    NotReady(SessionId),

    /// A distraction lies outside its session's `[started_at, ended_at]` span.
    #[error("Session {session_id} has a distraction outside its bounds")]
    MalformedTimeline { session_id: SessionId },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn already_ended(id: SessionId) -> Self {
        Self::InvalidState(format!("session {id} already ended"))
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
