//! Resolving the resumable session.
//!
//! The candidate is the most recently started session without an end. One
//! that has been open for longer than the max age is stale: it stays in
//! storage and in the day stats, but is not offered for resume and is never
//! closed here.

use chrono::{DateTime, Duration, Utc};
use focus_core::error::Result;
use focus_core::store::SessionStore;
use focus_core::types::ActiveSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveState {
    None,
    Active(ActiveSession),
    Stale(ActiveSession),
}

impl ActiveState {
    /// An age exactly equal to `max_age` is still active.
    pub fn classify(candidate: Option<ActiveSession>, now: DateTime<Utc>, max_age: Duration) -> Self {
        match candidate {
            None => Self::None,
            Some(active) if active.session.age(now) > max_age => Self::Stale(active),
            Some(active) => Self::Active(active),
        }
    }

    /// Stale sessions are reported as no session.
    pub fn into_active(self) -> Option<ActiveSession> {
        match self {
            Self::Active(active) => Some(active),
            Self::None | Self::Stale(_) => None,
        }
    }
}

pub fn max_age_from_hours(hours: u32) -> Duration {
    Duration::hours(i64::from(hours))
}

pub fn resolve_active_session(
    store: &dyn SessionStore,
    now: DateTime<Utc>,
    max_age: Duration,
) -> Result<Option<ActiveSession>> {
    let state = ActiveState::classify(store.latest_unended_session()?, now, max_age);
    if let ActiveState::Stale(stale) = &state {
        tracing::debug!(
            session_id = stale.session.id,
            started_at = %stale.session.started_at,
            "Ignoring stale unended session"
        );
    }
    Ok(state.into_active())
}
