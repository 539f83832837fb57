//! Calendar-day bucketing in a fixed local offset.
//!
//! Days are decided by converting instants to a fixed UTC offset; there is no
//! DST handling. A session belongs to the local day containing its
//! `started_at`.

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use focus_core::config::AnalyticsConfig;
use focus_core::error::Result;
use focus_core::types::SessionTimeline;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayZone {
    offset: FixedOffset,
}

impl DayZone {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self::new(config.utc_offset()?))
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.local_date(now)
    }

    /// Local midnight at the start of `date`, as a UTC instant.
    pub fn day_start_utc(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN).and_utc();
        local_midnight
            .checked_sub_signed(Duration::seconds(i64::from(self.offset.local_minus_utc())))
            .unwrap_or(local_midnight)
    }

    /// `[start, end)` of the local day in UTC.
    pub fn day_bounds_utc(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.day_start_utc(date),
            self.day_start_utc(next_day(date)),
        )
    }

    /// Today and the `days - 1` preceding local days, most recent first.
    /// Stops early at the earliest representable date.
    pub fn trend_days(&self, now: DateTime<Utc>, days: u32) -> Vec<NaiveDate> {
        let today = self.today(now);
        (0..days)
            .map_while(|back| today.checked_sub_days(Days::new(u64::from(back))))
            .collect()
    }

    /// UTC range covering the whole trend: oldest local midnight to the
    /// midnight after today.
    pub fn window_bounds_utc(&self, now: DateTime<Utc>, days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = self.today(now);
        let oldest = today
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        (
            self.day_start_utc(oldest),
            self.day_start_utc(next_day(today)),
        )
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

/// Group timelines by the local date of their start.
pub fn bucket_by_day<'a>(
    zone: &DayZone,
    timelines: &'a [SessionTimeline],
) -> BTreeMap<NaiveDate, Vec<&'a SessionTimeline>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&SessionTimeline>> = BTreeMap::new();
    for timeline in timelines {
        buckets
            .entry(zone.local_date(timeline.session.started_at))
            .or_default()
            .push(timeline);
    }
    buckets
}
