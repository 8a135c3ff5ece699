use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One use of a topic by a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageEntry {
    pub channel: String,
    pub topic: String,
    #[serde(with = "timestamp_format")]
    pub timestamp: DateTime<Utc>,
}

impl UsageEntry {
    pub fn new(channel: impl Into<String>, topic: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            channel: channel.into(),
            topic: topic.into(),
            timestamp,
        }
    }
}

/// Written as RFC 3339 in UTC. Older history files hold naive ISO
/// timestamps in the writer's local time; those are read as local time.
pub(crate) mod timestamp_format {
    use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, TimeZone};

    #[test]
    fn test_serializes_as_utc_rfc3339() {
        let entry = UsageEntry::new(
            "movies",
            "Inception ending explained",
            Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2025-01-02T03:04:05.000000Z");
        assert_eq!(json["channel"], "movies");
    }

    #[test]
    fn test_reads_naive_timestamps_as_local_time() {
        let parsed = timestamp_format::parse("2025-01-02T03:04:05.123456").unwrap();
        let naive = NaiveDate::from_ymd_opt(2025, 1, 2)
            .unwrap()
            .and_hms_micro_opt(3, 4, 5, 123456)
            .unwrap();
        let expected = Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc);
        assert_eq!(parsed, expected);

        assert!(timestamp_format::parse("2025-01-02").is_none());
    }

    #[test]
    fn test_reads_offset_timestamps() {
        let parsed = timestamp_format::parse("2025-01-02T05:04:05+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
    }
}
