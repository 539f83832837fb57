//! Analytics over focus sessions and their distractions.
//!
//! Computes per-session streak summaries, buckets sessions into local calendar
//! days, folds them into today and trend statistics, and renders markdown
//! reports.

pub mod active;
pub mod aggregations;
pub mod buckets;
pub mod reports;
pub mod service;
pub mod streak;

pub use active::{resolve_active_session, ActiveState};
pub use aggregations::{DayAggregate, DayTrend, Stats, StatsAggregator};
pub use buckets::{bucket_by_day, DayZone};
pub use reports::ReportGenerator;
pub use service::FocusService;
pub use streak::{longest_streak, session_summary, streak_gaps, EndedSession, SessionSummary};
