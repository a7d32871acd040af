use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::{Duration, OffsetDateTime};

/// UTC instant used across the domain model, serialized as RFC3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    pub fn inner(&self) -> &OffsetDateTime {
        &self.0
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// This instant plus a duration. Saturates on overflow rather than
    /// panicking so a hostile ttl cannot take the process down.
    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.checked_add(duration).unwrap_or(OffsetDateTime::new_utc(
            time::Date::MAX,
            time::Time::MIDNIGHT,
        )))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .0
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let datetime = OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339)
            .map_err(|e| {
                CoreError::invalid_timestamp(format!("Failed to parse timestamp '{s}': {e}"))
            })?;
        Ok(Timestamp(datetime))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self
            .0
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timestamp::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }
}

pub fn now_utc() -> Timestamp {
    Timestamp(OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::new(datetime!(2024-03-01 09:30:00 UTC));
        assert_eq!(ts.to_string(), "2024-03-01T09:30:00Z");
    }

    #[test]
    fn test_timestamp_from_str() {
        let ts = Timestamp::from_str("2024-03-01T09:30:00Z").unwrap();
        assert_eq!(ts.0, datetime!(2024-03-01 09:30:00 UTC));
    }

    #[test]
    fn test_timestamp_from_str_with_offset() {
        let ts = Timestamp::from_str("2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(
            ts.0.to_offset(time::UtcOffset::UTC),
            datetime!(2024-03-01 07:30:00 UTC)
        );
    }

    #[test]
    fn test_timestamp_from_str_invalid() {
        assert!(Timestamp::from_str("not-a-date").is_err());
        assert!(Timestamp::from_str("2024-13-01T00:00:00Z").is_err());
        assert!(Timestamp::from_str("").is_err());
    }

    #[test]
    fn test_timestamp_serde_roundtrip() {
        let ts = Timestamp::new(datetime!(2024-03-01 09:30:00 UTC));
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-03-01T09:30:00Z\"");

        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::new(datetime!(2024-03-01 09:30:00 UTC));
        let t2 = Timestamp::new(datetime!(2024-03-01 09:30:01 UTC));
        assert!(t1 < t2);
        assert!(t2 > t1);
    }

    #[test]
    fn test_saturating_add() {
        let ts = Timestamp::new(datetime!(2024-03-01 09:30:00 UTC));
        let later = ts.saturating_add(Duration::seconds(3600));
        assert_eq!(later.0, datetime!(2024-03-01 10:30:00 UTC));

        // A duration far past the representable range saturates instead of panicking
        let far = ts.saturating_add(Duration::seconds(i64::MAX));
        assert!(far > ts);
    }

    #[test]
    fn test_now_utc_monotonic_enough() {
        let a = now_utc();
        let b = now_utc();
        assert!(b >= a);
    }

    #[test]
    fn test_error_message_content() {
        match Timestamp::from_str("bad-date") {
            Err(CoreError::InvalidTimestamp(msg)) => {
                assert!(msg.contains("bad-date"));
            }
            _ => panic!("Expected InvalidTimestamp error"),
        }
    }
}
