// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::errors::MarshalError;
use crate::exporters::kafka::jaeger::model::{self, SpanRefType, TraceId};
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue, any_value};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::span::{Event, SpanKind};
use opentelemetry_proto::tonic::trace::v1::status::StatusCode;
use opentelemetry_proto::tonic::trace::v1::{Span, Status};

const SERVICE_NAME: &str = "service.name";
const NO_SERVICE_NAME: &str = "OTLPResourceNoServiceName";

const TAG_SPAN_KIND: &str = "span.kind";
const TAG_STATUS_CODE: &str = "otel.status_code";
const TAG_STATUS_DESCRIPTION: &str = "otel.status_description";
const TAG_ERROR: &str = "error";
const TAG_SCOPE_NAME: &str = "otel.scope.name";
const TAG_SCOPE_VERSION: &str = "otel.scope.version";
const TAG_TRACE_STATE: &str = "w3c.tracestate";
const TAG_EVENT: &str = "event";

/// Builds the Jaeger process for a resource. `service.name` becomes the service name, every
/// other attribute becomes a process tag.
pub fn process_from_resource(resource: Option<&Resource>) -> model::Process {
    let mut service_name = None;
    let mut tags = Vec::new();

    for kv in resource.map(|r| r.attributes.as_slice()).unwrap_or_default() {
        if kv.key == SERVICE_NAME {
            service_name = Some(any_value_to_string(kv.value.as_ref()));
            continue;
        }
        tags.push(key_value_to_tag(kv));
    }

    model::Process {
        service_name: service_name.unwrap_or_else(|| NO_SERVICE_NAME.to_string()),
        tags,
    }
}

/// Parses a 16 byte OTLP trace id. Empty, short or all-zero ids are rejected.
pub fn trace_id(bytes: &[u8]) -> Result<TraceId, MarshalError> {
    let raw: [u8; 16] = bytes.try_into().map_err(|_| {
        MarshalError::Translation(format!("trace id must be 16 bytes, got {}", bytes.len()))
    })?;
    let id = TraceId::from_bytes(raw);
    if id.is_zero() {
        return Err(MarshalError::Translation(
            "trace id must be non-zero".to_string(),
        ));
    }
    Ok(id)
}

fn span_id(bytes: &[u8]) -> Result<Vec<u8>, MarshalError> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        MarshalError::Translation(format!("span id must be 8 bytes, got {}", bytes.len()))
    })?;
    if raw == [0; 8] {
        return Err(MarshalError::Translation(
            "span id must be non-zero".to_string(),
        ));
    }
    Ok(raw.to_vec())
}

/// Translates one OTLP span. The process is left unset, the caller decides whether to embed it.
pub fn span_to_jaeger(
    span: &Span,
    scope: Option<&InstrumentationScope>,
) -> Result<model::Span, MarshalError> {
    let id = trace_id(&span.trace_id)?;

    let mut references = Vec::with_capacity(span.links.len() + 1);
    if !span.parent_span_id.is_empty() {
        references.push(model::SpanRef {
            trace_id: trace_id_bytes(id),
            span_id: span_id(&span.parent_span_id)?,
            ref_type: SpanRefType::ChildOf.into(),
        });
    }
    for link in &span.links {
        references.push(model::SpanRef {
            trace_id: trace_id_bytes(trace_id(&link.trace_id)?),
            span_id: span_id(&link.span_id)?,
            ref_type: SpanRefType::FollowsFrom.into(),
        });
    }

    let duration_nanos = span
        .end_time_unix_nano
        .saturating_sub(span.start_time_unix_nano);

    let mut tags: Vec<model::KeyValue> = span.attributes.iter().map(key_value_to_tag).collect();
    tags.extend(span_tags(span, scope));

    Ok(model::Span {
        trace_id: trace_id_bytes(id),
        span_id: span_id(&span.span_id)?,
        operation_name: span.name.clone(),
        references,
        flags: 0,
        start_time: Some(timestamp(span.start_time_unix_nano)),
        duration: Some(duration(duration_nanos)),
        tags,
        logs: span.events.iter().map(event_to_log).collect(),
        process: None,
        process_id: String::new(),
        warnings: Vec::new(),
    })
}

fn trace_id_bytes(id: TraceId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16);
    bytes.extend_from_slice(&id.high.to_be_bytes());
    bytes.extend_from_slice(&id.low.to_be_bytes());
    bytes
}

fn span_tags(span: &Span, scope: Option<&InstrumentationScope>) -> Vec<model::KeyValue> {
    let mut tags = Vec::new();

    if let Some(kind) = span_kind_name(span.kind()) {
        tags.push(model::KeyValue::string(TAG_SPAN_KIND, kind));
    }
    if let Some(status) = &span.status {
        tags.extend(status_tags(status));
    }
    if let Some(scope) = scope {
        if !scope.name.is_empty() {
            tags.push(model::KeyValue::string(TAG_SCOPE_NAME, scope.name.as_str()));
        }
        if !scope.version.is_empty() {
            tags.push(model::KeyValue::string(
                TAG_SCOPE_VERSION,
                scope.version.as_str(),
            ));
        }
    }
    if !span.trace_state.is_empty() {
        tags.push(model::KeyValue::string(
            TAG_TRACE_STATE,
            span.trace_state.as_str(),
        ));
    }
    tags
}

fn span_kind_name(kind: SpanKind) -> Option<&'static str> {
    match kind {
        SpanKind::Unspecified => None,
        SpanKind::Internal => Some("internal"),
        SpanKind::Server => Some("server"),
        SpanKind::Client => Some("client"),
        SpanKind::Producer => Some("producer"),
        SpanKind::Consumer => Some("consumer"),
    }
}

fn status_tags(status: &Status) -> Vec<model::KeyValue> {
    let mut tags = Vec::new();
    match status.code() {
        StatusCode::Unset => {}
        StatusCode::Ok => tags.push(model::KeyValue::string(TAG_STATUS_CODE, "OK")),
        StatusCode::Error => {
            tags.push(model::KeyValue::string(TAG_STATUS_CODE, "ERROR"));
            tags.push(model::KeyValue::bool(TAG_ERROR, true));
        }
    }
    if !status.message.is_empty() {
        tags.push(model::KeyValue::string(
            TAG_STATUS_DESCRIPTION,
            status.message.as_str(),
        ));
    }
    tags
}

fn event_to_log(event: &Event) -> model::Log {
    let mut fields = Vec::with_capacity(event.attributes.len() + 1);
    if !event.name.is_empty() {
        fields.push(model::KeyValue::string(TAG_EVENT, event.name.as_str()));
    }
    fields.extend(event.attributes.iter().map(key_value_to_tag));
    model::Log {
        timestamp: Some(timestamp(event.time_unix_nano)),
        fields,
    }
}

fn timestamp(unix_nanos: u64) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: (unix_nanos / 1_000_000_000) as i64,
        nanos: (unix_nanos % 1_000_000_000) as i32,
    }
}

fn duration(nanos: u64) -> prost_types::Duration {
    prost_types::Duration {
        seconds: (nanos / 1_000_000_000) as i64,
        nanos: (nanos % 1_000_000_000) as i32,
    }
}

fn key_value_to_tag(kv: &KeyValue) -> model::KeyValue {
    let key = kv.key.clone();
    match kv.value.as_ref().and_then(|v| v.value.as_ref()) {
        Some(any_value::Value::BoolValue(b)) => model::KeyValue::bool(key, *b),
        Some(any_value::Value::IntValue(i)) => model::KeyValue::int64(key, *i),
        Some(any_value::Value::DoubleValue(d)) => model::KeyValue::float64(key, *d),
        Some(any_value::Value::BytesValue(b)) => model::KeyValue::binary(key, b.clone()),
        _ => model::KeyValue::string(key, any_value_to_string(kv.value.as_ref())),
    }
}

// Arrays and maps are rendered as JSON
fn any_value_to_string(value: Option<&AnyValue>) -> String {
    match value.and_then(|v| v.value.as_ref()) {
        Some(any_value::Value::StringValue(s)) => s.clone(),
        Some(any_value::Value::BoolValue(b)) => b.to_string(),
        Some(any_value::Value::IntValue(i)) => i.to_string(),
        Some(any_value::Value::DoubleValue(d)) => d.to_string(),
        Some(any_value::Value::BytesValue(b)) => {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode(b)
        }
        Some(_) => any_value_to_json(value).to_string(),
        None => String::new(),
    }
}

fn any_value_to_json(value: Option<&AnyValue>) -> serde_json::Value {
    use serde_json::Value as Json;

    match value.and_then(|v| v.value.as_ref()) {
        Some(any_value::Value::StringValue(s)) => Json::String(s.clone()),
        Some(any_value::Value::BoolValue(b)) => Json::Bool(*b),
        Some(any_value::Value::IntValue(i)) => Json::from(*i),
        Some(any_value::Value::DoubleValue(d)) => Json::from(*d),
        Some(any_value::Value::BytesValue(_)) => Json::String(any_value_to_string(value)),
        Some(any_value::Value::ArrayValue(arr)) => Json::Array(
            arr.values
                .iter()
                .map(|v| any_value_to_json(Some(v)))
                .collect(),
        ),
        Some(any_value::Value::KvlistValue(kvs)) => Json::Object(
            kvs.values
                .iter()
                .map(|kv| (kv.key.clone(), any_value_to_json(kv.value.as_ref())))
                .collect(),
        ),
        None => Json::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::kafka::jaeger::model::ValueType;
    use opentelemetry_proto::tonic::common::v1::ArrayValue;
    use opentelemetry_proto::tonic::trace::v1::span::Link;

    fn attr(key: &str, value: any_value::Value) -> KeyValue {
        KeyValue {
            key: key.to_string(),
            value: Some(AnyValue { value: Some(value) }),
        }
    }

    fn test_span() -> Span {
        Span {
            trace_id: (1..=16).collect(),
            span_id: (1..=8).collect(),
            name: "foo".to_string(),
            start_time_unix_nano: 10,
            end_time_unix_nano: 20,
            ..Default::default()
        }
    }

    fn find_tag<'a>(tags: &'a [model::KeyValue], key: &str) -> Option<&'a model::KeyValue> {
        tags.iter().find(|t| t.key == key)
    }

    #[test]
    fn test_process_from_resource() {
        let resource = Resource {
            attributes: vec![
                attr(SERVICE_NAME, any_value::Value::StringValue("checkout".into())),
                attr("host.name", any_value::Value::StringValue("h1".into())),
            ],
            ..Default::default()
        };
        let process = process_from_resource(Some(&resource));
        assert_eq!("checkout", process.service_name);
        assert_eq!(1, process.tags.len());
        assert_eq!("host.name", process.tags[0].key);
        assert_eq!("h1", process.tags[0].v_str);
    }

    #[test]
    fn test_process_without_service_name() {
        assert_eq!(NO_SERVICE_NAME, process_from_resource(None).service_name);
    }

    #[test]
    fn test_basic_span() {
        let span = span_to_jaeger(&test_span(), None).unwrap();
        assert_eq!("foo", span.operation_name);
        assert_eq!((1..=16).collect::<Vec<u8>>(), span.trace_id);
        assert_eq!((1..=8).collect::<Vec<u8>>(), span.span_id);
        assert_eq!(
            Some(prost_types::Timestamp {
                seconds: 0,
                nanos: 10
            }),
            span.start_time
        );
        assert_eq!(
            Some(prost_types::Duration {
                seconds: 0,
                nanos: 10
            }),
            span.duration
        );
        assert!(span.references.is_empty());
        assert!(span.process.is_none());
    }

    #[test]
    fn test_references() {
        let mut otel = test_span();
        otel.parent_span_id = vec![9; 8];
        otel.links.push(Link {
            trace_id: vec![7; 16],
            span_id: vec![3; 8],
            ..Default::default()
        });

        let span = span_to_jaeger(&otel, None).unwrap();
        assert_eq!(2, span.references.len());
        assert_eq!(SpanRefType::ChildOf as i32, span.references[0].ref_type);
        assert_eq!(otel.trace_id, span.references[0].trace_id);
        assert_eq!(vec![9; 8], span.references[0].span_id);
        assert_eq!(SpanRefType::FollowsFrom as i32, span.references[1].ref_type);
        assert_eq!(vec![7; 16], span.references[1].trace_id);
    }

    #[test]
    fn test_tags() {
        let mut otel = test_span();
        otel.kind = SpanKind::Server.into();
        otel.status = Some(Status {
            code: StatusCode::Error.into(),
            message: "boom".to_string(),
        });
        otel.attributes = vec![
            attr("http.status_code", any_value::Value::IntValue(500)),
            attr(
                "tags",
                any_value::Value::ArrayValue(ArrayValue {
                    values: vec![AnyValue {
                        value: Some(any_value::Value::StringValue("a".into())),
                    }],
                }),
            ),
        ];
        let scope = InstrumentationScope {
            name: "lib".to_string(),
            version: "1.0".to_string(),
            ..Default::default()
        };

        let span = span_to_jaeger(&otel, Some(&scope)).unwrap();
        let tags = &span.tags;
        assert_eq!(500, find_tag(tags, "http.status_code").unwrap().v_int64);
        assert_eq!(
            ValueType::Int64 as i32,
            find_tag(tags, "http.status_code").unwrap().v_type
        );
        assert_eq!("[\"a\"]", find_tag(tags, "tags").unwrap().v_str);
        assert_eq!("server", find_tag(tags, TAG_SPAN_KIND).unwrap().v_str);
        assert_eq!("ERROR", find_tag(tags, TAG_STATUS_CODE).unwrap().v_str);
        assert_eq!("boom", find_tag(tags, TAG_STATUS_DESCRIPTION).unwrap().v_str);
        assert!(find_tag(tags, TAG_ERROR).unwrap().v_bool);
        assert_eq!("lib", find_tag(tags, TAG_SCOPE_NAME).unwrap().v_str);
        assert_eq!("1.0", find_tag(tags, TAG_SCOPE_VERSION).unwrap().v_str);
    }

    #[test]
    fn test_unset_kind_and_status_add_no_tags() {
        let span = span_to_jaeger(&test_span(), None).unwrap();
        assert!(span.tags.is_empty());
    }

    #[test]
    fn test_events_become_logs() {
        let mut otel = test_span();
        otel.events.push(Event {
            time_unix_nano: 1_500_000_000,
            name: "retry".to_string(),
            attributes: vec![attr("attempt", any_value::Value::IntValue(2))],
            ..Default::default()
        });

        let span = span_to_jaeger(&otel, None).unwrap();
        assert_eq!(1, span.logs.len());
        let log = &span.logs[0];
        assert_eq!(
            Some(prost_types::Timestamp {
                seconds: 1,
                nanos: 500_000_000
            }),
            log.timestamp
        );
        assert_eq!("retry", find_tag(&log.fields, TAG_EVENT).unwrap().v_str);
        assert_eq!(2, find_tag(&log.fields, "attempt").unwrap().v_int64);
    }

    #[test]
    fn test_invalid_ids() {
        let mut otel = test_span();
        otel.trace_id = vec![];
        assert!(matches!(
            span_to_jaeger(&otel, None),
            Err(MarshalError::Translation(_))
        ));

        let mut otel = test_span();
        otel.trace_id = vec![0; 16];
        assert!(span_to_jaeger(&otel, None).is_err());

        let mut otel = test_span();
        otel.span_id = vec![0; 8];
        assert!(span_to_jaeger(&otel, None).is_err());

        let mut otel = test_span();
        otel.span_id = vec![1; 4];
        assert!(span_to_jaeger(&otel, None).is_err());
    }
}
