//! Request input parsing. Everything here runs before any store access.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::ids::{BigId, IdParseError};

pub const DEFAULT_TAKE: i64 = 50;
pub const MAX_TAKE: i64 = 200;

pub fn parse_segment_id(raw: &str) -> Result<BigId, AppError> {
    parse_id("segmentId", raw)
}

fn parse_id(field: &str, raw: &str) -> Result<BigId, AppError> {
    raw.parse::<BigId>().map_err(|e| match e {
        IdParseError::NotDigits => {
            AppError::BadRequest(format!("{field} must be a numeric string"))
        }
        IdParseError::OutOfRange => AppError::BadRequest(format!("{field} {e}")),
    })
}

/// External user ids arrive either as digit strings or as plain JSON integers.
pub fn parse_strava_id(value: Option<&Value>) -> Result<BigId, AppError> {
    match value {
        Some(Value::String(s)) => parse_id("stravaId", s),
        Some(Value::Number(n)) if n.is_u64() => parse_id("stravaId", &n.to_string()),
        Some(Value::Null) | None => Err(AppError::BadRequest("stravaId is required".into())),
        Some(_) => Err(AppError::BadRequest(
            "stravaId must be a numeric string".into(),
        )),
    }
}

/// Accepts a JSON number or a numeric string; the result must be finite.
pub fn parse_score(value: Option<&Value>) -> Result<f64, AppError> {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score
        .filter(|s| s.is_finite())
        .ok_or_else(|| AppError::BadRequest("bestWindScore must be a finite number".into()))
}

pub fn parse_timestamp(value: Option<&Value>) -> Result<DateTime<Utc>, AppError> {
    value
        .and_then(Value::as_str)
        .and_then(parse_datetime)
        .ok_or_else(|| AppError::BadRequest("bestAt must be a valid date-time".into()))
}

/// RFC 3339 with offset; naive date-times and bare dates are read as UTC.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Optional profile text. `null` and absent both mean "not supplied".
pub fn parse_optional_text(field: &str, value: Option<&Value>) -> Result<Option<String>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AppError::BadRequest(format!("{field} must be a string"))),
    }
}

/// Unparsable values fall back to the default; everything is clamped to
/// `1..=MAX_TAKE`.
pub fn clamp_take(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_TAKE)
        .clamp(1, MAX_TAKE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn is_bad_request<T: std::fmt::Debug>(r: Result<T, AppError>) -> bool {
        matches!(r, Err(AppError::BadRequest(_)))
    }

    #[test]
    fn test_segment_id_digits_only() {
        assert_eq!(parse_segment_id("100").unwrap(), BigId(100));
        assert!(is_bad_request(parse_segment_id("abc")));
        assert!(is_bad_request(parse_segment_id("12.5")));
        assert!(is_bad_request(parse_segment_id("")));
    }

    #[test]
    fn test_segment_id_magnitude() {
        assert!(is_bad_request(parse_segment_id("123456789012345678901234")));
    }

    #[test]
    fn test_strava_id_string_or_integer() {
        assert_eq!(parse_strava_id(Some(&json!("12345"))).unwrap(), BigId(12345));
        assert_eq!(parse_strava_id(Some(&json!(12345))).unwrap(), BigId(12345));
        assert!(is_bad_request(parse_strava_id(Some(&json!(-1)))));
        assert!(is_bad_request(parse_strava_id(Some(&json!(1.5)))));
        assert!(is_bad_request(parse_strava_id(Some(&json!("12a")))));
        assert!(is_bad_request(parse_strava_id(None)));
    }

    #[test]
    fn test_score_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_score(Some(&json!(5))).unwrap(), 5.0);
        assert_eq!(parse_score(Some(&json!(-2.25))).unwrap(), -2.25);
        assert_eq!(parse_score(Some(&json!("7.5"))).unwrap(), 7.5);
    }

    #[test]
    fn test_score_rejects_non_finite_and_garbage() {
        assert!(is_bad_request(parse_score(Some(&json!("NaN")))));
        assert!(is_bad_request(parse_score(Some(&json!("inf")))));
        assert!(is_bad_request(parse_score(Some(&json!("fast")))));
        assert!(is_bad_request(parse_score(Some(&json!("")))));
        assert!(is_bad_request(parse_score(Some(&json!(true)))));
        assert!(is_bad_request(parse_score(Some(&Value::Null))));
        assert!(is_bad_request(parse_score(None)));
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp(Some(&json!("2024-01-01T00:00:00Z"))).unwrap(), expected);
        assert_eq!(
            parse_timestamp(Some(&json!("2024-01-01T02:00:00+02:00"))).unwrap(),
            expected
        );
        assert_eq!(parse_timestamp(Some(&json!("2024-01-01T00:00:00"))).unwrap(), expected);
        assert_eq!(parse_timestamp(Some(&json!("2024-01-01"))).unwrap(), expected);
    }

    #[test]
    fn test_timestamp_rejects_invalid() {
        assert!(is_bad_request(parse_timestamp(Some(&json!("")))));
        assert!(is_bad_request(parse_timestamp(Some(&json!("yesterday")))));
        assert!(is_bad_request(parse_timestamp(Some(&json!("2024-02-30")))));
        assert!(is_bad_request(parse_timestamp(Some(&json!(1704067200)))));
        assert!(is_bad_request(parse_timestamp(None)));
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(parse_optional_text("email", None).unwrap(), None);
        assert_eq!(parse_optional_text("email", Some(&Value::Null)).unwrap(), None);
        assert_eq!(
            parse_optional_text("email", Some(&json!("a@b.c"))).unwrap(),
            Some("a@b.c".to_string())
        );
        assert!(is_bad_request(parse_optional_text("email", Some(&json!(3)))));
    }

    #[test]
    fn test_clamp_take() {
        assert_eq!(clamp_take(None), 50);
        assert_eq!(clamp_take(Some("10")), 10);
        assert_eq!(clamp_take(Some("500")), 200);
        assert_eq!(clamp_take(Some("0")), 1);
        assert_eq!(clamp_take(Some("-3")), 1);
        assert_eq!(clamp_take(Some("lots")), 50);
    }
}
