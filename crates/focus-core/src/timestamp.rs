//! Timestamp codec used at storage and transport boundaries.
//!
//! Everything inside the workspace works on `DateTime<Utc>`. Text only appears
//! when a timestamp is persisted or serialized, always as
//! `YYYY-MM-DDTHH:MM:SSZ`. Parsing also accepts an explicit offset
//! (`+05:30`, `+00:00`) and normalizes to UTC.

use crate::error::{Result, TrackerError};
use chrono::{DateTime, SubsecRound, Utc};

/// Canonical textual form: second precision with a bare `Z` marker.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Current instant truncated to whole seconds.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub fn format_utc(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Parse a timestamp carrying either `Z` or an explicit UTC offset.
pub fn parse_utc(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|err| TrackerError::InvalidTimestamp(format!("'{value}': {err}")))
}

/// `#[serde(with = "...")]` adapter for `DateTime<Utc>` fields.
pub mod serde_utc {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_utc(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_utc(&raw).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "...")]` adapter for `Option<DateTime<Utc>>` fields.
pub mod serde_utc_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&super::format_utc(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| super::parse_utc(&value).map_err(serde::de::Error::custom))
            .transpose()
    }
}
