use chrono::{DateTime, SecondsFormat, Utc};

/// Current time truncated to millisecond precision. Attempt timestamps are
/// the grouping key of the log and must survive serialization round-trips
/// unchanged, so sub-millisecond digits are dropped before the value is
/// ever written.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub fn to_millis_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a client-supplied timestamp. Accepts RFC 3339 (any offset) and,
/// as a fallback, a bare epoch-milliseconds integer.
pub fn parse_client_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_timestamp_round_trips_through_iso() {
        let at = now_millis();
        let encoded = to_millis_iso(at);
        let decoded = parse_client_timestamp(&encoded).expect("parse own output");
        assert_eq!(decoded, at);
    }

    #[test]
    fn parses_epoch_millis_fallback() {
        let dt = parse_client_timestamp("1756453113025").expect("epoch millis");
        assert_eq!(dt.timestamp_millis(), 1756453113025);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_client_timestamp("yesterday").is_none());
    }
}
