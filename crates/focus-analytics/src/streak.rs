//! Focus streaks over a single session's distraction timeline.
//!
//! A session's boundary sequence is `[started_at] + distractions + [ended_at]`;
//! the gaps between consecutive boundaries are its streaks.

use chrono::{DateTime, Utc};
use focus_core::error::{Result, TrackerError};
use focus_core::types::{Session, SessionTimeline};
use serde::{Deserialize, Serialize};

/// Per-session numbers reported once a session has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub duration_seconds: f64,
    pub distraction_count: u32,
    pub average_streak_seconds: f64,
    pub longest_streak_seconds: f64,
}

/// An ended session together with its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedSession {
    #[serde(flatten)]
    pub session: Session,
    pub summary: SessionSummary,
}

pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Round to two decimal places for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Gaps between consecutive boundaries, in seconds: `n + 1` values for `n`
/// distractions. Distractions are sorted before use; out-of-bounds timestamps
/// produce negative gaps rather than an error.
pub fn streak_gaps(
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    distractions: &[DateTime<Utc>],
) -> Vec<f64> {
    let mut times = distractions.to_vec();
    times.sort_unstable();

    let mut gaps = Vec::with_capacity(times.len() + 1);
    let mut previous = started_at;
    for t in times {
        gaps.push(seconds_between(previous, t));
        previous = t;
    }
    gaps.push(seconds_between(previous, ended_at));
    gaps
}

/// Longest uninterrupted span in seconds, or `0.0` while the session is
/// still running.
pub fn longest_streak(
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    distractions: &[DateTime<Utc>],
) -> f64 {
    let Some(ended_at) = ended_at else {
        return 0.0;
    };
    streak_gaps(started_at, ended_at, distractions)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Summarize an ended session.
///
/// Fails with `NotReady` while the session is running and with
/// `MalformedTimeline` if a distraction lies outside the session's span.
pub fn session_summary(timeline: &SessionTimeline) -> Result<SessionSummary> {
    let session = &timeline.session;
    let Some(ended_at) = session.ended_at else {
        return Err(TrackerError::NotReady(session.id));
    };
    if !timeline.is_well_ordered() {
        return Err(TrackerError::MalformedTimeline {
            session_id: session.id,
        });
    }

    let duration = seconds_between(session.started_at, ended_at);
    let count = timeline.distraction_count();
    let num_streaks = if count > 0 { count + 1 } else { 1 };
    let longest = longest_streak(session.started_at, Some(ended_at), &timeline.distractions);

    Ok(SessionSummary {
        duration_seconds: round2(duration),
        distraction_count: count,
        average_streak_seconds: round2(duration / f64::from(num_streaks)),
        longest_streak_seconds: round2(longest),
    })
}
