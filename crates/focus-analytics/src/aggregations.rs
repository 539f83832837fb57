//! Per-day rollups and the "today" / trend statistics.
//!
//! Fetches one window of timelines from the store, buckets them by local day,
//! runs the streak calculator per session and folds the results.

use crate::buckets::{bucket_by_day, DayZone};
use crate::streak::{longest_streak, round2, seconds_between};
use chrono::{DateTime, NaiveDate, Utc};
use focus_core::config::{AnalyticsConfig, MAX_TREND_DAYS};
use focus_core::error::Result;
use focus_core::store::SessionStore;
use focus_core::types::SessionTimeline;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// One row of the multi-day trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTrend {
    pub date: String,
    pub session_count: u32,
    pub total_distractions: u32,
    pub longest_streak_seconds: f64,
}

/// Today's headline numbers plus the trend, most recent day first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub today_sessions: u32,
    pub today_distractions_per_hour: f64,
    pub today_longest_streak_seconds: f64,
    pub last_7_days: Vec<DayTrend>,
}

/// Folded values for the sessions of one local day.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DayAggregate {
    /// Every session in the bucket, ended or not.
    pub session_count: u32,
    pub total_distractions: u32,
    /// Maximum over qualifying sessions, `0.0` if none qualify.
    pub longest_streak_seconds: f64,
}

impl DayAggregate {
    pub fn fold<'a>(timelines: impl IntoIterator<Item = &'a SessionTimeline>) -> Self {
        let mut aggregate = Self::default();
        let mut longest: Option<f64> = None;

        for timeline in timelines {
            aggregate.session_count += 1;
            aggregate.total_distractions += timeline.distraction_count();

            let streak = longest_streak(
                timeline.session.started_at,
                timeline.session.ended_at,
                &timeline.distractions,
            );
            if counts_toward_longest(streak, timeline) {
                longest = Some(longest.map_or(streak, |current| current.max(streak)));
            }
        }

        aggregate.longest_streak_seconds = longest.unwrap_or(0.0);
        aggregate
    }
}

/// A streak enters the day's pool when it is positive, or when the session
/// ended without distractions. The second clause only matters for
/// zero-duration sessions, whose streak of `0.0` still counts.
fn counts_toward_longest(streak: f64, timeline: &SessionTimeline) -> bool {
    streak > 0.0 || (timeline.session.is_ended() && timeline.distractions.is_empty())
}

/// Distractions per elapsed hour since local midnight. At exactly midnight
/// the elapsed time is taken as one hour.
pub fn distractions_per_hour(
    distractions: u32,
    today_start_utc: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    let elapsed_seconds = seconds_between(today_start_utc, now).max(0.0);
    let elapsed_hours = if elapsed_seconds > 0.0 {
        elapsed_seconds / 3600.0
    } else {
        1.0
    };
    f64::from(distractions) / elapsed_hours
}

/// Stats engine over a fixed-offset calendar.
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    zone: DayZone,
    trend_days: u32,
    date_format: String,
}

impl StatsAggregator {
    pub fn new(zone: DayZone, trend_days: u32, date_format: impl Into<String>) -> Self {
        Self {
            zone,
            trend_days: trend_days.clamp(1, MAX_TREND_DAYS),
            date_format: date_format.into(),
        }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            DayZone::from_config(config)?,
            config.trend_days,
            config.trend_date_format.clone(),
        ))
    }

    /// Fetch the trend window from the store and compute stats.
    pub fn compute(&self, store: &dyn SessionStore, now: DateTime<Utc>) -> Result<Stats> {
        let (start, end) = self.zone.window_bounds_utc(now, self.trend_days);
        let timelines = store.timelines_started_between(start, end)?;
        tracing::debug!(
            sessions = timelines.len(),
            window_start = %start,
            window_end = %end,
            "Computing stats"
        );
        Ok(self.fold(&timelines, now))
    }

    /// Trend label for `day`; an unusable format falls back to ISO dates.
    fn label(&self, day: NaiveDate) -> String {
        let mut label = String::new();
        if write!(label, "{}", day.format(&self.date_format)).is_err() {
            tracing::warn!(format = %self.date_format, "Invalid trend date format");
            return day.to_string();
        }
        label
    }

    /// Compute stats from already-fetched timelines. Sessions outside the
    /// trend window are ignored.
    pub fn fold(&self, timelines: &[SessionTimeline], now: DateTime<Utc>) -> Stats {
        for timeline in timelines.iter().filter(|t| !t.is_well_ordered()) {
            tracing::warn!(
                session_id = timeline.id(),
                "Session has distractions outside its bounds; streaks may be negative"
            );
        }

        let buckets = bucket_by_day(&self.zone, timelines);
        let today = self.zone.today(now);
        let today_aggregate = aggregate_for(&buckets, today);
        let today_start = self.zone.day_start_utc(today);

        let last_7_days = self
            .zone
            .trend_days(now, self.trend_days)
            .into_iter()
            .map(|day| {
                let aggregate = aggregate_for(&buckets, day);
                DayTrend {
                    date: self.label(day),
                    session_count: aggregate.session_count,
                    total_distractions: aggregate.total_distractions,
                    longest_streak_seconds: round2(aggregate.longest_streak_seconds),
                }
            })
            .collect();

        Stats {
            today_sessions: today_aggregate.session_count,
            today_distractions_per_hour: round2(distractions_per_hour(
                today_aggregate.total_distractions,
                today_start,
                now,
            )),
            today_longest_streak_seconds: round2(today_aggregate.longest_streak_seconds),
            last_7_days,
        }
    }
}

fn aggregate_for(
    buckets: &BTreeMap<NaiveDate, Vec<&SessionTimeline>>,
    day: NaiveDate,
) -> DayAggregate {
    buckets
        .get(&day)
        .map(|sessions| DayAggregate::fold(sessions.iter().copied()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, TimeZone};
    use focus_core::types::Session;
    use focus_store::MemoryStore;

    fn zone() -> DayZone {
        DayZone::new(FixedOffset::east_opt(19_800).unwrap())
    }

    fn aggregator() -> StatsAggregator {
        StatsAggregator::new(zone(), 7, "%d-%m-%Y")
    }

    /// 2025-03-05 12:00 IST.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 6, 30, 0).unwrap()
    }

    fn timeline(
        id: i64,
        start: DateTime<Utc>,
        end_after: Option<i64>,
        distractions_after: &[i64],
    ) -> SessionTimeline {
        SessionTimeline::new(
            Session {
                id,
                started_at: start,
                ended_at: end_after.map(|s| start + Duration::seconds(s)),
            },
            distractions_after
                .iter()
                .map(|s| start + Duration::seconds(*s))
                .collect(),
        )
    }

    #[test]
    fn test_fold_empty_day() {
        let aggregate = DayAggregate::fold(std::iter::empty());
        assert_eq!(aggregate, DayAggregate::default());
        assert_eq!(aggregate.longest_streak_seconds, 0.0);
    }

    #[test]
    fn test_fold_counts_and_max() {
        let start = now() - Duration::hours(3);
        let sessions = [
            timeline(1, start, Some(100), &[10, 50]),
            timeline(2, start + Duration::minutes(10), Some(300), &[]),
            timeline(3, start + Duration::minutes(20), None, &[5, 6, 7]),
        ];

        let aggregate = DayAggregate::fold(sessions.iter());
        assert_eq!(aggregate.session_count, 3);
        assert_eq!(aggregate.total_distractions, 5);
        assert_eq!(aggregate.longest_streak_seconds, 300.0);
    }

    #[test]
    fn test_unended_session_never_sets_longest() {
        let start = now() - Duration::hours(5);
        let sessions = [timeline(1, start, None, &[])];

        let aggregate = DayAggregate::fold(sessions.iter());
        assert_eq!(aggregate.session_count, 1);
        assert_eq!(aggregate.longest_streak_seconds, 0.0);
    }

    #[test]
    fn test_zero_duration_session_qualifies() {
        let start = now() - Duration::hours(1);
        let zero = timeline(1, start, Some(0), &[]);
        assert!(counts_toward_longest(0.0, &zero));

        let running = timeline(2, start, None, &[]);
        assert!(!counts_toward_longest(0.0, &running));

        let distracted = timeline(3, start, Some(0), &[0]);
        assert!(!counts_toward_longest(0.0, &distracted));
    }

    #[test]
    fn test_negative_streaks_are_excluded() {
        let start = now() - Duration::hours(1);
        // Distraction after the end: gaps are [20, -10].
        let malformed = timeline(1, start, Some(10), &[20]);
        let aggregate = DayAggregate::fold([&malformed]);
        assert_eq!(aggregate.longest_streak_seconds, 20.0);

        let all_negative = timeline(2, start, Some(0), &[-5]);
        let aggregate = DayAggregate::fold([&all_negative]);
        // Gaps [-5, 5]: max is 5.
        assert_eq!(aggregate.longest_streak_seconds, 5.0);
    }

    #[test]
    fn test_distractions_per_hour() {
        let midnight = zone().day_start_utc(zone().today(now()));
        // 12 hours elapsed at noon IST.
        assert_eq!(distractions_per_hour(6, midnight, now()), 0.5);
        // At midnight the divisor is one hour.
        assert_eq!(distractions_per_hour(3, midnight, midnight), 3.0);
        // A clock before midnight also falls back to one hour.
        assert_eq!(
            distractions_per_hour(2, midnight, midnight - Duration::seconds(5)),
            2.0
        );
    }

    #[test]
    fn test_rate_never_drops_when_adding_a_distraction() {
        let midnight = zone().day_start_utc(zone().today(now()));
        for elapsed in [0, 1, 59, 3600, 40_000] {
            let at = midnight + Duration::seconds(elapsed);
            for n in 0..20 {
                assert!(
                    distractions_per_hour(n + 1, midnight, at) >= distractions_per_hour(n, midnight, at)
                );
            }
        }
    }

    #[test]
    fn test_stats_empty_week() {
        let stats = aggregator().fold(&[], now());
        assert_eq!(stats.today_sessions, 0);
        assert_eq!(stats.today_distractions_per_hour, 0.0);
        assert_eq!(stats.today_longest_streak_seconds, 0.0);
        assert_eq!(stats.last_7_days.len(), 7);
        assert_eq!(stats.last_7_days[0].date, "05-03-2025");
        assert_eq!(stats.last_7_days[6].date, "27-02-2025");
    }

    #[test]
    fn test_stats_activity_on_one_day() {
        // 2025-03-03 10:00 IST: two days before "today".
        let day3 = Utc.with_ymd_and_hms(2025, 3, 3, 4, 30, 0).unwrap();
        let timelines = vec![
            timeline(1, day3, Some(100), &[10, 50]),
            timeline(2, day3 + Duration::hours(2), Some(600), &[100]),
        ];

        let stats = aggregator().fold(&timelines, now());
        assert_eq!(stats.today_sessions, 0);
        assert_eq!(stats.last_7_days.len(), 7);

        for (i, day) in stats.last_7_days.iter().enumerate() {
            if i == 2 {
                assert_eq!(day.date, "03-03-2025");
                assert_eq!(day.session_count, 2);
                assert_eq!(day.total_distractions, 3);
                assert_eq!(day.longest_streak_seconds, 500.0);
            } else {
                assert_eq!(day.session_count, 0);
                assert_eq!(day.total_distractions, 0);
                assert_eq!(day.longest_streak_seconds, 0.0);
            }
        }
    }

    #[test]
    fn test_stats_today_values() {
        let morning = now() - Duration::hours(4);
        let timelines = vec![
            timeline(1, morning, Some(1800), &[600, 900]),
            timeline(2, morning + Duration::hours(1), None, &[60]),
        ];

        let stats = aggregator().fold(&timelines, now());
        assert_eq!(stats.today_sessions, 2);
        // 3 distractions over 12 elapsed hours.
        assert_eq!(stats.today_distractions_per_hour, 0.25);
        assert_eq!(stats.today_longest_streak_seconds, 900.0);
        assert_eq!(stats.last_7_days[0].session_count, 2);
        assert_eq!(stats.last_7_days[0].total_distractions, 3);
    }

    #[test]
    fn test_stats_rounding() {
        // 1 distraction, 7 hours elapsed: 0.142857... per hour.
        let seven_am = Utc.with_ymd_and_hms(2025, 3, 5, 1, 30, 0).unwrap();
        let timelines = vec![timeline(1, seven_am - Duration::hours(1), None, &[30])];
        let stats = aggregator().fold(&timelines, seven_am);
        assert_eq!(stats.today_distractions_per_hour, 0.14);
    }

    #[test]
    fn test_compute_reads_window_from_store() {
        let store = MemoryStore::new();
        let day_start = zone().day_start_utc(zone().today(now()));

        // Inside the window: today and six days back.
        let today = store.create_session(day_start + Duration::hours(1)).unwrap();
        store
            .record_distraction(today.id, day_start + Duration::hours(1) + Duration::minutes(5))
            .unwrap();
        store
            .end_session(today.id, day_start + Duration::hours(2))
            .unwrap();
        store
            .create_session(day_start - Duration::days(6) + Duration::minutes(1))
            .unwrap();

        // Outside: seven days back and tomorrow.
        store
            .create_session(day_start - Duration::days(6) - Duration::seconds(1))
            .unwrap();
        store
            .create_session(day_start + Duration::days(1))
            .unwrap();

        let stats = aggregator().compute(&store, now()).unwrap();
        let total: u32 = stats.last_7_days.iter().map(|d| d.session_count).sum();
        assert_eq!(total, 2);
        assert_eq!(stats.today_sessions, 1);
        assert_eq!(stats.today_longest_streak_seconds, 3300.0);
        assert_eq!(stats.last_7_days[6].session_count, 1);
    }

    #[test]
    fn test_custom_trend_length_and_format() {
        let aggregator = StatsAggregator::new(zone(), 3, "%Y-%m-%d");
        let stats = aggregator.fold(&[], now());
        let dates: Vec<_> = stats.last_7_days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-03-05", "2025-03-04", "2025-03-03"]);
    }

    #[test]
    fn test_unusable_date_format_falls_back_to_iso() {
        let aggregator = StatsAggregator::new(zone(), 2, "%Q");
        let stats = aggregator.fold(&[], now());
        assert_eq!(stats.last_7_days[0].date, "2025-03-05");
        assert_eq!(stats.last_7_days[1].date, "2025-03-04");
    }

    #[test]
    fn test_trend_length_is_clamped() {
        let stats = StatsAggregator::new(zone(), 200_000_000, "%d-%m-%Y").fold(&[], now());
        assert_eq!(stats.last_7_days.len(), MAX_TREND_DAYS as usize);

        let stats = StatsAggregator::new(zone(), 0, "%d-%m-%Y").fold(&[], now());
        assert_eq!(stats.last_7_days.len(), 1);
    }

    #[test]
    fn test_from_config_validates() {
        let bad = AnalyticsConfig {
            trend_days: 0,
            ..AnalyticsConfig::default()
        };
        assert!(StatsAggregator::from_config(&bad).is_err());
        assert!(StatsAggregator::from_config(&AnalyticsConfig::default()).is_ok());
    }
}
