use crate::timestamp::{serde_utc, serde_utc_option};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type SessionId = i64;
pub type DistractionId = i64;

/// A tracked span of focused work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(with = "serde_utc")]
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when tracking stops.
    #[serde(default, with = "serde_utc_option")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Time elapsed since the session started.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.started_at
    }
}

/// An interruption logged against a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distraction {
    pub id: DistractionId,
    pub session_id: SessionId,
    #[serde(with = "serde_utc")]
    pub created_at: DateTime<Utc>,
}

/// A session together with its distraction timestamps, read as one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimeline {
    pub session: Session,
    /// Sorted ascending.
    pub distractions: Vec<DateTime<Utc>>,
}

impl SessionTimeline {
    pub fn new(session: Session, mut distractions: Vec<DateTime<Utc>>) -> Self {
        distractions.sort_unstable();
        Self {
            session,
            distractions,
        }
    }

    pub fn id(&self) -> SessionId {
        self.session.id
    }

    pub fn distraction_count(&self) -> u32 {
        u32::try_from(self.distractions.len()).unwrap_or(u32::MAX)
    }

    /// True when every distraction lies in `[started_at, ended_at]` and the
    /// session does not end before it starts. Unended sessions only check the
    /// lower bound.
    pub fn is_well_ordered(&self) -> bool {
        let start = self.session.started_at;
        match self.session.ended_at {
            Some(end) => {
                end >= start && self.distractions.iter().all(|t| *t >= start && *t <= end)
            }
            None => self.distractions.iter().all(|t| *t >= start),
        }
    }
}

/// The resume view of an unended session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    #[serde(flatten)]
    pub session: Session,
    pub distraction_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn session(ended: Option<i64>) -> Session {
        Session {
            id: 7,
            started_at: at(0),
            ended_at: ended.map(at),
        }
    }

    #[test]
    fn test_timeline_sorts_distractions() {
        let timeline = SessionTimeline::new(session(Some(100)), vec![at(50), at(10), at(30)]);
        assert_eq!(timeline.distractions, vec![at(10), at(30), at(50)]);
        assert_eq!(timeline.distraction_count(), 3);
    }

    #[test]
    fn test_well_ordered_bounds() {
        assert!(SessionTimeline::new(session(Some(100)), vec![at(0), at(100)]).is_well_ordered());
        assert!(!SessionTimeline::new(session(Some(100)), vec![at(101)]).is_well_ordered());
        assert!(!SessionTimeline::new(session(Some(100)), vec![at(-1)]).is_well_ordered());
        assert!(SessionTimeline::new(session(None), vec![at(500)]).is_well_ordered());
    }

    #[test]
    fn test_session_age() {
        let s = session(Some(90));
        assert!(s.is_ended());
        assert_eq!(s.age(at(3600)), Duration::hours(1));
        assert!(!session(None).is_ended());
    }

    #[test]
    fn test_session_json_shape() {
        let json = serde_json::to_value(session(None)).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["started_at"], "2025-06-01T08:00:00Z");
        assert!(json["ended_at"].is_null());
    }

    #[test]
    fn test_active_session_flattens() {
        let active = ActiveSession {
            session: session(None),
            distraction_count: 2,
        };
        let json = serde_json::to_value(&active).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["distraction_count"], 2);

        let back: ActiveSession = serde_json::from_value(json).unwrap();
        assert_eq!(back, active);
    }
}
