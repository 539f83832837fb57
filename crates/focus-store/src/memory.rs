//! In-memory session store for tests and throwaway runs.

use chrono::{DateTime, Utc};
use focus_core::error::{Result, TrackerError};
use focus_core::store::SessionStore;
use focus_core::types::{ActiveSession, Distraction, Session, SessionId, SessionTimeline};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    sessions: BTreeMap<SessionId, Session>,
    distractions: Vec<Distraction>,
    next_session_id: SessionId,
    next_distraction_id: i64,
}

impl Tables {
    fn times_for(&self, id: SessionId) -> Vec<DateTime<Utc>> {
        let mut times: Vec<_> = self
            .distractions
            .iter()
            .filter(|d| d.session_id == id)
            .map(|d| d.created_at)
            .collect();
        times.sort_unstable();
        times
    }
}

/// Both tables live behind one lock, so every call observes a consistent
/// snapshot.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SessionStore for MemoryStore {
    fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session> {
        let mut tables = self.lock();
        tables.next_session_id += 1;
        let session = Session {
            id: tables.next_session_id,
            started_at,
            ended_at: None,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn end_session(&self, id: SessionId, ended_at: DateTime<Utc>) -> Result<SessionTimeline> {
        let mut tables = self.lock();
        let session = tables.sessions.get(&id).ok_or(TrackerError::NotFound(id))?;
        if session.is_ended() {
            return Err(TrackerError::already_ended(id));
        }
        let started_at = session.started_at;
        let times = tables.times_for(id);
        let latest = times.last().copied().unwrap_or(started_at);
        if ended_at < latest.max(started_at) {
            return Err(TrackerError::MalformedTimeline { session_id: id });
        }

        let session = tables
            .sessions
            .get_mut(&id)
            .ok_or(TrackerError::NotFound(id))?;
        session.ended_at = Some(ended_at);
        Ok(SessionTimeline::new(session.clone(), times))
    }

    fn record_distraction(
        &self,
        id: SessionId,
        created_at: DateTime<Utc>,
    ) -> Result<Distraction> {
        let mut tables = self.lock();
        let session = tables.sessions.get(&id).ok_or(TrackerError::NotFound(id))?;
        if session.is_ended() {
            return Err(TrackerError::already_ended(id));
        }
        if created_at < session.started_at {
            return Err(TrackerError::MalformedTimeline { session_id: id });
        }

        tables.next_distraction_id += 1;
        let distraction = Distraction {
            id: tables.next_distraction_id,
            session_id: id,
            created_at,
        };
        tables.distractions.push(distraction.clone());
        Ok(distraction)
    }

    fn session(&self, id: SessionId) -> Result<Option<Session>> {
        Ok(self.lock().sessions.get(&id).cloned())
    }

    fn timeline(&self, id: SessionId) -> Result<Option<SessionTimeline>> {
        let tables = self.lock();
        Ok(tables
            .sessions
            .get(&id)
            .map(|session| SessionTimeline::new(session.clone(), tables.times_for(id))))
    }

    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>> {
        let tables = self.lock();
        let mut sessions: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.started_at >= start && s.started_at < end)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| (s.started_at, s.id));
        Ok(sessions)
    }

    fn distraction_times(&self, id: SessionId) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.lock().times_for(id))
    }

    fn distraction_times_for(
        &self,
        ids: &[SessionId],
    ) -> Result<HashMap<SessionId, Vec<DateTime<Utc>>>> {
        let tables = self.lock();
        let mut by_session: HashMap<SessionId, Vec<DateTime<Utc>>> =
            ids.iter().map(|id| (*id, Vec::new())).collect();
        for d in &tables.distractions {
            if let Some(times) = by_session.get_mut(&d.session_id) {
                times.push(d.created_at);
            }
        }
        for times in by_session.values_mut() {
            times.sort_unstable();
        }
        Ok(by_session)
    }

    fn latest_unended_session(&self) -> Result<Option<ActiveSession>> {
        let tables = self.lock();
        let candidate = tables
            .sessions
            .values()
            .filter(|s| !s.is_ended())
            .max_by_key(|s| (s.started_at, s.id));

        Ok(candidate.map(|session| ActiveSession {
            session: session.clone(),
            distraction_count: u32::try_from(
                tables
                    .distractions
                    .iter()
                    .filter(|d| d.session_id == session.id)
                    .count(),
            )
            .unwrap_or(u32::MAX),
        }))
    }

    fn timelines_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionTimeline>> {
        let tables = self.lock();
        let mut timelines: Vec<SessionTimeline> = tables
            .sessions
            .values()
            .filter(|s| s.started_at >= start && s.started_at < end)
            .map(|s| SessionTimeline::new(s.clone(), tables.times_for(s.id)))
            .collect();
        timelines.sort_by_key(|t| (t.session.started_at, t.session.id));
        Ok(timelines)
    }
}
