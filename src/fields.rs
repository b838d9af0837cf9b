//! Field names and builders for the gateway log line.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tonic::{Code, Status};

use crate::{level::code_name, logger::Fields};

pub const SYSTEM_FIELD: &str = "system";
pub const KIND_FIELD: &str = "span.kind";
pub const SERVICE_FIELD: &str = "grpc.service";
pub const METHOD_FIELD: &str = "grpc.method";
pub const START_TIME_FIELD: &str = "grpc.start_time";
pub const DEADLINE_FIELD: &str = "grpc.request.deadline";
pub const DURATION_FIELD: &str = "grpc.time_ms";
pub const CODE_FIELD: &str = "grpc.code";
pub const ERROR_FIELD: &str = "error";
pub const LOG_FLAG_FIELD: &str = "log-trace-key";

/// Marker written in place of values that could not be determined.
pub const VALUE_UNDEFINED: &str = "undefined";

/// Fields known before the call is made.
pub fn call_fields(
    service: &str,
    method: &str,
    start: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(SYSTEM_FIELD.into(), "grpc".into());
    fields.insert(KIND_FIELD.into(), "gateway".into());
    fields.insert(SERVICE_FIELD.into(), service.into());
    fields.insert(METHOD_FIELD.into(), method.into());
    fields.insert(START_TIME_FIELD.into(), format_time(start).into());
    if let Some(deadline) = deadline {
        fields.insert(DEADLINE_FIELD.into(), format_time(deadline).into());
    }
    fields
}

/// Fields describing how the call ended.
pub fn outcome_fields(elapsed: Duration, error: Option<&Status>) -> Fields {
    let code = error.map_or(Code::Ok, Status::code);

    let mut fields = Fields::new();
    fields.insert(DURATION_FIELD.into(), duration_millis(elapsed).into());
    fields.insert(CODE_FIELD.into(), code_name(code).into());
    if let Some(status) = error {
        fields.insert(ERROR_FIELD.into(), format_status(status).into());
    }
    fields
}

pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Milliseconds with microsecond resolution.
pub fn duration_millis(elapsed: Duration) -> f64 {
    elapsed.as_micros() as f64 / 1000.0
}

pub fn format_status(status: &Status) -> String {
    format!(
        "rpc error: code = {} desc = {}",
        code_name(status.code()),
        status.message()
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn static_fields() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let deadline = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 35).unwrap();

        let fields = call_fields("svc.Pkg", "Method", start, Some(deadline));

        assert_eq!(fields[SYSTEM_FIELD], "grpc");
        assert_eq!(fields[KIND_FIELD], "gateway");
        assert_eq!(fields[SERVICE_FIELD], "svc.Pkg");
        assert_eq!(fields[METHOD_FIELD], "Method");
        assert_eq!(fields[START_TIME_FIELD], "2024-03-01T12:30:05Z");
        assert_eq!(fields[DEADLINE_FIELD], "2024-03-01T12:30:35Z");
    }

    #[test]
    fn no_deadline_field_without_deadline() {
        let fields = call_fields("s", "m", Utc::now(), None);
        assert!(!fields.contains_key(DEADLINE_FIELD));
    }

    #[test]
    fn ok_outcome() {
        let fields = outcome_fields(Duration::from_micros(1500), None);

        assert_eq!(fields[DURATION_FIELD], 1.5);
        assert_eq!(fields[CODE_FIELD], "OK");
        assert!(!fields.contains_key(ERROR_FIELD));
    }

    #[test]
    fn failed_outcome() {
        let status = Status::not_found("no such thing");
        let fields = outcome_fields(Duration::from_millis(3), Some(&status));

        assert_eq!(fields[CODE_FIELD], "NotFound");
        assert_eq!(
            fields[ERROR_FIELD],
            "rpc error: code = NotFound desc = no such thing"
        );
    }
}
