//! Session lifecycle and analytics over a shared store.
//!
//! Every call recomputes from the store; nothing about the active session is
//! cached in process.

use crate::active::{max_age_from_hours, resolve_active_session};
use crate::aggregations::{Stats, StatsAggregator};
use crate::streak::{session_summary, EndedSession, SessionSummary};
use chrono::{DateTime, Duration, Utc};
use focus_core::config::AnalyticsConfig;
use focus_core::error::{Result, TrackerError};
use focus_core::store::SessionStore;
use focus_core::types::{ActiveSession, Distraction, Session, SessionId};
use std::sync::Arc;

pub struct FocusService {
    store: Arc<dyn SessionStore>,
    aggregator: StatsAggregator,
    max_active_age: Duration,
}

impl FocusService {
    pub fn new(store: Arc<dyn SessionStore>, config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            store,
            aggregator: StatsAggregator::from_config(config)?,
            max_active_age: max_age_from_hours(config.active_session_max_age_hours),
        })
    }

    pub fn start_session(&self, now: DateTime<Utc>) -> Result<Session> {
        let session = self.store.create_session(now)?;
        tracing::info!(session_id = session.id, "Session started");
        Ok(session)
    }

    /// End a session and summarize it from the same snapshot.
    pub fn end_session(&self, id: SessionId, now: DateTime<Utc>) -> Result<EndedSession> {
        let timeline = self.store.end_session(id, now)?;
        let summary = session_summary(&timeline)?;
        tracing::info!(
            session_id = id,
            duration_seconds = summary.duration_seconds,
            distractions = summary.distraction_count,
            "Session ended"
        );
        Ok(EndedSession {
            session: timeline.session,
            summary,
        })
    }

    pub fn record_distraction(&self, id: SessionId, now: DateTime<Utc>) -> Result<Distraction> {
        let distraction = self.store.record_distraction(id, now)?;
        tracing::debug!(session_id = id, distraction_id = distraction.id, "Distraction recorded");
        Ok(distraction)
    }

    pub fn session(&self, id: SessionId) -> Result<Session> {
        self.store.session(id)?.ok_or(TrackerError::NotFound(id))
    }

    /// Summary of an ended session: `NotFound` for unknown ids, `NotReady`
    /// while it is still running.
    pub fn session_summary(&self, id: SessionId) -> Result<SessionSummary> {
        let timeline = self.store.timeline(id)?.ok_or(TrackerError::NotFound(id))?;
        session_summary(&timeline)
    }

    pub fn active_session(&self, now: DateTime<Utc>) -> Result<Option<ActiveSession>> {
        resolve_active_session(self.store.as_ref(), now, self.max_active_age)
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Result<Stats> {
        self.aggregator.compute(self.store.as_ref(), now)
    }
}
