//! JSON event formatter used by [`setup`](crate::setup::setup).

use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

use crate::logger::FIELDS_KEY;

/// Writes each event as one JSON object per line.
///
/// Event fields are flattened into the object. The `fields` value written by
/// [`TracingSink`](crate::logger::TracingSink) is expanded back into a nested
/// object, so call fields stay queryable as `fields["grpc.service"]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut line = Map::new();
        line.insert(
            "timestamp".into(),
            Utc::now()
                .to_rfc3339_opts(SecondsFormat::Micros, true)
                .into(),
        );
        line.insert("level".into(), metadata.level().to_string().into());
        line.insert("target".into(), metadata.target().into());
        event.record(&mut JsonVisitor(&mut line));

        let line = serde_json::to_string(&line).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}

struct JsonVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for JsonVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        let value = match field.name() {
            FIELDS_KEY => serde_json::from_str::<Value>(value)
                .ok()
                .filter(Value::is_object)
                .unwrap_or_else(|| value.into()),
            _ => value.into(),
        };
        self.0.insert(field.name().into(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().into(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0.insert(field.name().into(), value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().into(), format!("{value:?}").into());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use tracing_core::LevelFilter;

    use super::*;
    use crate::logger::Logger;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<Value> {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .event_format(JsonFormat)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        buffer.lines()
    }

    #[test]
    fn logger_fields_are_nested_objects() {
        let lines = capture(|| {
            Logger::new(LevelFilter::INFO)
                .with_field("grpc.service", "svc.Pkg")
                .with_field("grpc.time_ms", 1.5)
                .info("finished client unary call with code OK");
        });

        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["message"], "finished client unary call with code OK");
        assert_eq!(line["fields"]["grpc.service"], "svc.Pkg");
        assert_eq!(line["fields"]["grpc.time_ms"], 1.5);
        assert!(line["timestamp"].is_string());
    }

    #[test]
    fn plain_events_are_flattened() {
        let lines = capture(|| {
            tracing::warn!(attempt = 3, retry = true, fields = "not json", "retrying");
        });

        let line = &lines[0];
        assert_eq!(line["level"], "WARN");
        assert_eq!(line["message"], "retrying");
        assert_eq!(line["attempt"], 3);
        assert_eq!(line["retry"], true);
        assert_eq!(line["fields"], "not json");
    }
}
