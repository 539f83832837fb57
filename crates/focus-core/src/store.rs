//! Repository interface over the session and distraction tables.
//!
//! Analytics code depends on this trait only; each storage backend provides
//! one implementation returning the uniform records in [`crate::types`].

use crate::error::Result;
use crate::types::{ActiveSession, Distraction, Session, SessionId, SessionTimeline};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub trait SessionStore: Send + Sync {
    /// Insert a new unended session.
    fn create_session(&self, started_at: DateTime<Utc>) -> Result<Session>;

    /// Set `ended_at` and return the session with its distractions, read in
    /// the same transaction as the update.
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidState` when the
    /// session has already ended.
    fn end_session(&self, id: SessionId, ended_at: DateTime<Utc>) -> Result<SessionTimeline>;

    /// Append a distraction to an unended session.
    ///
    /// The "not ended" check and the insert happen atomically.
    fn record_distraction(&self, id: SessionId, created_at: DateTime<Utc>)
        -> Result<Distraction>;

    fn session(&self, id: SessionId) -> Result<Option<Session>>;

    /// A session and its distractions as one consistent snapshot.
    fn timeline(&self, id: SessionId) -> Result<Option<SessionTimeline>>;

    /// Sessions with `started_at` in `[start, end)`, ordered by start time.
    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>>;

    /// Distraction timestamps for one session, ascending.
    fn distraction_times(&self, id: SessionId) -> Result<Vec<DateTime<Utc>>>;

    /// Distraction timestamps for many sessions in a single fetch. Every
    /// requested id is present in the result, possibly with an empty list.
    fn distraction_times_for(
        &self,
        ids: &[SessionId],
    ) -> Result<HashMap<SessionId, Vec<DateTime<Utc>>>>;

    /// The most recently started session without `ended_at`, regardless of
    /// its age, with its distraction count.
    fn latest_unended_session(&self) -> Result<Option<ActiveSession>>;

    /// Timelines for every session started in `[start, end)`.
    ///
    /// Backends that can read both tables in one transaction should override
    /// this; the default issues one session query plus one batched
    /// distraction query.
    fn timelines_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SessionTimeline>> {
        let sessions = self.sessions_started_between(start, end)?;
        let ids: Vec<SessionId> = sessions.iter().map(|s| s.id).collect();
        let mut by_session = self.distraction_times_for(&ids)?;
        Ok(sessions
            .into_iter()
            .map(|session| {
                let times = by_session.remove(&session.id).unwrap_or_default();
                SessionTimeline::new(session, times)
            })
            .collect())
    }
}
