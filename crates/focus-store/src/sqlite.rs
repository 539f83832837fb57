//! SQLite-backed session store.
//!
//! Timestamps are stored as `YYYY-MM-DDTHH:MM:SSZ` text, so range filters on
//! `started_at` compare lexicographically in chronological order. Every
//! operation that reads or writes more than one statement runs inside a
//! single transaction on the shared connection.

use chrono::{DateTime, Utc};
use focus_core::error::{Result, TrackerError};
use focus_core::store::SessionStore;
use focus_core::timestamp::{format_utc, parse_utc};
use focus_core::types::{ActiveSession, Distraction, Session, SessionId, SessionTimeline};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Upper bound on ids per `IN (...)` list.
const MAX_BATCH: usize = 500;

trait StorageResultExt<T> {
    fn storage(self) -> Result<T>;
}

impl<T> StorageResultExt<T> for rusqlite::Result<T> {
    fn storage(self) -> Result<T> {
        self.map_err(|err| TrackerError::Storage(err.to_string()))
    }
}

type SessionRow = (i64, String, Option<String>);

fn session_from_row((id, started_at, ended_at): SessionRow) -> Result<Session> {
    Ok(Session {
        id,
        started_at: parse_utc(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_utc).transpose()?,
    })
}

fn select_session(conn: &Connection, id: SessionId) -> Result<Option<Session>> {
    conn.query_row(
        "SELECT id, started_at, ended_at FROM sessions WHERE id = ?1",
        params![id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()
    .storage()?
    .map(session_from_row)
    .transpose()
}

fn select_distraction_times(conn: &Connection, id: SessionId) -> Result<Vec<DateTime<Utc>>> {
    let mut stmt = conn
        .prepare("SELECT created_at FROM distractions WHERE session_id = ?1 ORDER BY created_at")
        .storage()?;
    let rows = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .storage()?;

    let mut times = Vec::new();
    for row in rows {
        times.push(parse_utc(&row.storage()?)?);
    }
    Ok(times)
}

fn select_sessions_between(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Session>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, started_at, ended_at FROM sessions
             WHERE started_at >= ?1 AND started_at < ?2
             ORDER BY started_at, id",
        )
        .storage()?;
    let rows = stmt
        .query_map(params![format_utc(&start), format_utc(&end)], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .storage()?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(session_from_row(row.storage()?)?);
    }
    Ok(sessions)
}

fn select_distraction_times_for(
    conn: &Connection,
    ids: &[SessionId],
) -> Result<HashMap<SessionId, Vec<DateTime<Utc>>>> {
    let mut by_session: HashMap<SessionId, Vec<DateTime<Utc>>> =
        ids.iter().map(|id| (*id, Vec::new())).collect();

    for chunk in ids.chunks(MAX_BATCH) {
        let placeholders = vec!["?"; chunk.len()].join(",");
        let sql = format!(
            "SELECT session_id, created_at FROM distractions
             WHERE session_id IN ({placeholders}) ORDER BY created_at"
        );
        let mut stmt = conn.prepare(&sql).storage()?;
        let rows = stmt
            .query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })
            .storage()?;

        for row in rows {
            let (session_id, created_at) = row.storage()?;
            by_session
                .entry(session_id)
                .or_default()
                .push(parse_utc(&created_at)?);
        }
    }
    Ok(by_session)
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database file and run the schema migration.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).storage()?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            tracing::warn!("Failed to enable WAL mode: {}", err);
        }
        let store = Self::with_connection(conn, Some(path.to_path_buf()))?;
        tracing::info!("Session database opened at {}", path.display());
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().storage()?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON").storage()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at  TEXT NOT NULL,
            ended_at    TEXT
        );

        CREATE TABLE IF NOT EXISTS distractions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id  INTEGER NOT NULL REFERENCES sessions(id),
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_ended_at ON sessions(ended_at);
        CREATE INDEX IF NOT EXISTS idx_distractions_session_id ON distractions(session_id);",
    )
    .storage()
}

impl SessionStore for SqliteStore {
    fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO sessions (started_at, ended_at) VALUES (?1, NULL)",
            params![format_utc(&started_at)],
        )
        .storage()?;
        Ok(Session {
            id: conn.last_insert_rowid(),
            started_at,
            ended_at: None,
        })
    }

    fn end_session(&self, id: SessionId, ended_at: DateTime<Utc>) -> Result<SessionTimeline> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage()?;

        let mut session = select_session(&tx, id)?.ok_or(TrackerError::NotFound(id))?;
        if session.is_ended() {
            return Err(TrackerError::already_ended(id));
        }
        let distractions = select_distraction_times(&tx, id)?;
        let latest = distractions.last().copied().unwrap_or(session.started_at);
        if ended_at < latest.max(session.started_at) {
            return Err(TrackerError::MalformedTimeline { session_id: id });
        }

        tx.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE id = ?2",
            params![format_utc(&ended_at), id],
        )
        .storage()?;
        tx.commit().storage()?;

        session.ended_at = Some(ended_at);
        Ok(SessionTimeline::new(session, distractions))
    }

    fn record_distraction(
        &self,
        id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Result<Distraction> {
        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage()?;

        let session = select_session(&tx, id)?.ok_or(TrackerError::NotFound(id))?;
        if session.is_ended() {
            return Err(TrackerError::already_ended(id));
        }
        if created_at < session.started_at {
            return Err(TrackerError::MalformedTimeline { session_id: id });
        }

        tx.execute(
            "INSERT INTO distractions (session_id, created_at) VALUES (?1, ?2)",
            params![id, format_utc(&created_at)],
        )
        .storage()?;
        let distraction_id = tx.last_insert_rowid();
        tx.commit().storage()?;

        Ok(Distraction {
            id: distraction_id,
            session_id: id,
            created_at,
        })
    }

    fn session(&self, id: SessionId) -> Result<Option<Session>> {
        select_session(&self.lock(), id)
    }

    fn timeline(&self, id: SessionId) -> Result<Option<SessionTimeline>> {
        let mut conn = self.lock();
        let tx = conn.transaction().storage()?;
        let Some(session) = select_session(&tx, id)? else {
            return Ok(None);
        };
        let distractions = select_distraction_times(&tx, id)?;
        tx.commit().storage()?;
        Ok(Some(SessionTimeline::new(session, distractions)))
    }

    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        select_sessions_between(&self.lock(), start, end)
    }

    fn distraction_times(&self, id: SessionId) -> Result<Vec<DateTime<Utc>>> {
        select_distraction_times(&self.lock(), id)
    }

    fn distraction_times_for(
        &self,
        ids: &[SessionId],
    ) -> Result<HashMap<SessionId, Vec<DateTime<Utc>>>> {
        select_distraction_times_for(&self.lock(), ids)
    }

    fn latest_unended_session(&self) -> Result<Option<ActiveSession>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT s.id, s.started_at, s.ended_at, COUNT(d.id)
                 FROM sessions s
                 LEFT JOIN distractions d ON d.session_id = s.id
                 WHERE s.ended_at IS NULL
                 GROUP BY s.id, s.started_at, s.ended_at
                 ORDER BY s.started_at DESC, s.id DESC
                 LIMIT 1",
                [],
                |row| {
                    Ok((
                        (row.get(0)?, row.get(1)?, row.get(2)?),
                        row.get::<_, u32>(3)?,
                    ))
                },
            )
            .optional()
            .storage()?;

        row.map(|(session_row, distraction_count)| {
            Ok(ActiveSession {
                session: session_from_row(session_row)?,
                distraction_count,
            })
        })
        .transpose()
    }

    fn timelines_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionTimeline>> {
        let mut conn = self.lock();
        let tx = conn.transaction().storage()?;
        let sessions = select_sessions_between(&tx, start, end)?;
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        let mut by_session = select_distraction_times_for(&tx, &ids)?;
        tx.commit().storage()?;

        Ok(sessions
            .into_iter()
            .map(|session| {
                let times = by_session.remove(&session.id).unwrap_or_default();
                SessionTimeline::new(session, times)
            })
            .collect())
    }
}
