//! Synthetic telemetry content and its OTLP/JSON encoding
//!
//! Every log record and span is built from its position in the stream's
//! schedule. The content is fixed apart from the position, ids and
//! timestamps, so that collectors see a uniform and easily counted load.

use crate::config::{RunConfig, StreamKind};
use crate::util::time::unix_nanos;
use crate::worker::EventPosition;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde_json::{json, Value};
use std::time::{Duration, SystemTime};

pub const LOG_SERVICE_NAME: &str = "MyCompany.MyProduct.EventGeneratorLogTest";
pub const LOG_SERVICE_VERSION: &str = "1.0.0";
pub const LOG_SCOPE_NAME: &str = "Log";
pub const TRACE_SCOPE_NAME: &str = "MyCompany.MyProduct.MyLibrary";
pub const TRACE_SCOPE_VERSION: &str = "1.0.0";
pub const SPAN_NAME: &str = "SleepSpan";

/// OTLP `SEVERITY_NUMBER_INFO`
const SEVERITY_INFO: u8 = 9;
/// OTLP `SPAN_KIND_CONSUMER`
const SPAN_KIND_CONSUMER: u8 = 5;

/// Attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl AttributeValue {
    fn to_otlp(&self) -> Value {
        match self {
            AttributeValue::String(s) => json!({ "stringValue": s }),
            AttributeValue::Bool(b) => json!({ "boolValue": b }),
            // int64 is encoded as a decimal string in OTLP/JSON
            AttributeValue::Int(i) => json!({ "intValue": i.to_string() }),
            AttributeValue::Double(d) => json!({ "doubleValue": d }),
        }
    }
}

/// Key/value attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, AttributeValue::String(value.into()))
    }

    fn to_otlp(&self) -> Value {
        json!({ "key": self.key, "value": self.value.to_otlp() })
    }
}

fn encode_attributes(attributes: &[Attribute]) -> Vec<Value> {
    attributes.iter().map(Attribute::to_otlp).collect()
}

/// A synthetic log record
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: SystemTime,
    pub body: String,
    pub attributes: Vec<Attribute>,
}

/// A synthetic span
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub trace_id: u128,
    pub span_id: u64,
    pub name: String,
    pub start: SystemTime,
    pub end: SystemTime,
    pub attributes: Vec<Attribute>,
}

/// One event handed to an exporter connection
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Log(LogRecord),
    Span(SpanRecord),
}

impl Event {
    pub fn kind(&self) -> StreamKind {
        match self {
            Event::Log(_) => StreamKind::Log,
            Event::Span(_) => StreamKind::Trace,
        }
    }
}

/// Attributes shared by every log record of a batch
///
/// Array and map values are carried as JSON text.
pub fn batch_scope_attributes() -> Vec<Attribute> {
    let array = json!(["arr1", "arr2"]).to_string();
    let map = json!({ "some.map.key": "some value" }).to_string();

    vec![
        Attribute::string("string.attribute", "some string"),
        Attribute::new("boolean.attribute", AttributeValue::Bool(true)),
        Attribute::new("int.attribute", AttributeValue::Int(10)),
        Attribute::new("double.attribute", AttributeValue::Double(11.11)),
        Attribute::string("array.attribute", array),
        Attribute::string("map.attribute", map),
    ]
}

/// Resource attributes attached to every export of a stream
pub fn resource_for(kind: StreamKind) -> Vec<Attribute> {
    match kind {
        StreamKind::Log => {
            let host = hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string());
            vec![
                Attribute::string("service.name", LOG_SERVICE_NAME),
                Attribute::string("service.version", LOG_SERVICE_VERSION),
                Attribute::string("host", host),
                Attribute::string(
                    "os",
                    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
                ),
            ]
        }
        StreamKind::Trace => vec![
            Attribute::string("resource-attribute1", "v1"),
            Attribute::string("resource-attribute2", "v2"),
        ],
    }
}

/// Builds the events of one stream
pub struct EventFactory {
    kind: StreamKind,
    span_duration: Duration,
    scope_attributes: Vec<Attribute>,
    rng: Xoshiro256PlusPlus,
}

impl EventFactory {
    /// Spans last as long as the delay between events, since each span
    /// covers the wait that follows its emission.
    pub fn new(kind: StreamKind, config: &RunConfig) -> Self {
        Self::with_seed(kind, config.delay_between_events, rand::random())
    }

    pub fn with_seed(kind: StreamKind, span_duration: Duration, seed: u64) -> Self {
        Self {
            kind,
            span_duration,
            scope_attributes: batch_scope_attributes(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn build(&mut self, position: EventPosition) -> Event {
        match self.kind {
            StreamKind::Log => Event::Log(self.build_log(position)),
            StreamKind::Trace => Event::Span(self.build_span()),
        }
    }

    fn build_log(&self, position: EventPosition) -> LogRecord {
        let mut attributes = Vec::with_capacity(self.scope_attributes.len() + 2);
        attributes.push(Attribute::new(
            "Iteration",
            AttributeValue::Int(position.batch as i64),
        ));
        attributes.push(Attribute::new("Count", AttributeValue::Int(position.index as i64)));
        attributes.extend(self.scope_attributes.iter().cloned());

        LogRecord {
            timestamp: SystemTime::now(),
            body: format!("Example log record {} {}.", position.batch, position.index),
            attributes,
        }
    }

    fn build_span(&mut self) -> SpanRecord {
        // All-zero ids are invalid in OTLP
        let trace_id = self.rng.gen::<u128>().max(1);
        let span_id = self.rng.gen::<u64>().max(1);
        let start = SystemTime::now();

        SpanRecord {
            trace_id,
            span_id,
            name: SPAN_NAME.to_string(),
            start,
            end: start + self.span_duration,
            attributes: vec![Attribute::string("mykey", "myvalue")],
        }
    }
}

/// Encode a batch of events of one stream as an OTLP/JSON export request
///
/// Events of the other kind are skipped.
pub fn encode_request(kind: StreamKind, resource: &[Attribute], events: &[Event]) -> Value {
    let resource = json!({ "attributes": encode_attributes(resource) });

    match kind {
        StreamKind::Log => {
            let records: Vec<Value> = events
                .iter()
                .filter_map(|event| match event {
                    Event::Log(record) => Some(encode_log(record)),
                    Event::Span(_) => None,
                })
                .collect();
            json!({
                "resourceLogs": [{
                    "resource": resource,
                    "scopeLogs": [{
                        "scope": { "name": LOG_SCOPE_NAME },
                        "logRecords": records,
                    }],
                }],
            })
        }
        StreamKind::Trace => {
            let spans: Vec<Value> = events
                .iter()
                .filter_map(|event| match event {
                    Event::Span(span) => Some(encode_span(span)),
                    Event::Log(_) => None,
                })
                .collect();
            json!({
                "resourceSpans": [{
                    "resource": resource,
                    "scopeSpans": [{
                        "scope": { "name": TRACE_SCOPE_NAME, "version": TRACE_SCOPE_VERSION },
                        "spans": spans,
                    }],
                }],
            })
        }
    }
}

fn encode_log(record: &LogRecord) -> Value {
    let nanos = unix_nanos(record.timestamp).to_string();
    json!({
        "timeUnixNano": nanos,
        "observedTimeUnixNano": nanos,
        "severityNumber": SEVERITY_INFO,
        "severityText": "Information",
        "body": { "stringValue": record.body },
        "attributes": encode_attributes(&record.attributes),
    })
}

fn encode_span(span: &SpanRecord) -> Value {
    json!({
        "traceId": format!("{:032x}", span.trace_id),
        "spanId": format!("{:016x}", span.span_id),
        "name": span.name,
        "kind": SPAN_KIND_CONSUMER,
        "startTimeUnixNano": unix_nanos(span.start).to_string(),
        "endTimeUnixNano": unix_nanos(span.end).to_string(),
        "attributes": encode_attributes(&span.attributes),
    })
}
