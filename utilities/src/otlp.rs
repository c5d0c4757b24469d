use chrono::Utc;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::metrics::v1::ExportMetricsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value::StringValue;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::metrics::v1::metric::Data;
use opentelemetry_proto::tonic::metrics::v1::number_data_point::Value;
use opentelemetry_proto::tonic::metrics::v1::{
    Gauge, Metric, NumberDataPoint, ResourceMetrics, ScopeMetrics,
};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1;
use opentelemetry_proto::tonic::trace::v1::span::SpanKind;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Status};

const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.21.0";

pub struct FakeOTLP;

impl FakeOTLP {
    pub fn logs_service_request() -> ExportLogsServiceRequest {
        Self::logs_service_request_with_logs(1, 1)
    }

    pub fn logs_service_request_with_logs(
        num_resource_logs: usize,
        num_logs: usize,
    ) -> ExportLogsServiceRequest {
        let mut exp = ExportLogsServiceRequest {
            resource_logs: Vec::with_capacity(num_resource_logs),
        };
        for _i in 0..num_resource_logs {
            exp.resource_logs.push(Self::resource_logs(num_logs));
        }
        exp
    }

    fn resource_logs(num_logs: usize) -> ResourceLogs {
        let now_ns = now_nanos();
        let log_records = (0..num_logs)
            .map(|i| LogRecord {
                time_unix_nano: now_ns,
                observed_time_unix_nano: now_ns,
                severity_text: "WARNING".to_string(),
                body: Some(AnyValue {
                    value: Some(StringValue(format!("This is log message {}", i))),
                }),
                ..Default::default()
            })
            .collect();

        ResourceLogs {
            resource: Some(Self::resource()),
            scope_logs: vec![ScopeLogs {
                scope: None,
                log_records,
                schema_url: SCHEMA_URL.to_string(),
            }],
            schema_url: SCHEMA_URL.to_string(),
        }
    }

    pub fn metrics_service_request() -> ExportMetricsServiceRequest {
        Self::metrics_service_request_with_metrics(1, 1)
    }

    pub fn metrics_service_request_with_metrics(
        num_resource_metrics: usize,
        num_metrics: usize,
    ) -> ExportMetricsServiceRequest {
        Self::metrics_service_request_with_points(num_resource_metrics, num_metrics, 1)
    }

    /// Like `metrics_service_request_with_metrics`, but every gauge carries `num_points`
    /// data points.
    pub fn metrics_service_request_with_points(
        num_resource_metrics: usize,
        num_metrics: usize,
        num_points: usize,
    ) -> ExportMetricsServiceRequest {
        let mut exp = ExportMetricsServiceRequest {
            resource_metrics: Vec::with_capacity(num_resource_metrics),
        };
        for _i in 0..num_resource_metrics {
            exp.resource_metrics
                .push(Self::resource_metrics(num_metrics, num_points));
        }
        exp
    }

    fn resource_metrics(num_metrics: usize, num_points: usize) -> ResourceMetrics {
        let now_ns = now_nanos();
        let metrics = (0..num_metrics)
            .map(|i| {
                let data_points = (0..num_points)
                    .map(|p| NumberDataPoint {
                        start_time_unix_nano: now_ns,
                        time_unix_nano: now_ns,
                        value: Some(Value::AsDouble(p as f64)),
                        ..Default::default()
                    })
                    .collect();
                Metric {
                    name: format!("test-metric-{}", i),
                    description: "An example OTLP Metric".to_string(),
                    data: Some(Data::Gauge(Gauge { data_points })),
                    ..Default::default()
                }
            })
            .collect();

        ResourceMetrics {
            resource: Some(Self::resource()),
            scope_metrics: vec![ScopeMetrics {
                scope: None,
                metrics,
                schema_url: SCHEMA_URL.to_string(),
            }],
            schema_url: SCHEMA_URL.to_string(),
        }
    }

    pub fn trace_service_request() -> ExportTraceServiceRequest {
        Self::trace_service_request_with_spans(1, 1)
    }

    pub fn trace_service_request_with_spans(
        num_res_spans: usize,
        num_spans: usize,
    ) -> ExportTraceServiceRequest {
        let mut exp = ExportTraceServiceRequest {
            resource_spans: Vec::with_capacity(num_res_spans),
        };
        for _i in 0..num_res_spans {
            exp.resource_spans.push(Self::resource_spans(num_spans));
        }
        exp
    }

    fn resource_spans(num_spans: usize) -> ResourceSpans {
        let scope_spans = ScopeSpans {
            scope: Some(InstrumentationScope {
                name: "scope".to_string(),
                version: "0.0.1".to_string(),
                attributes: vec![string_attr("module", "api")],
                dropped_attributes_count: 0,
            }),
            spans: Self::trace_spans(num_spans),
            schema_url: SCHEMA_URL.to_string(),
        };
        ResourceSpans {
            resource: Some(Self::resource()),
            scope_spans: vec![scope_spans],
            schema_url: SCHEMA_URL.to_string(),
        }
    }

    /// Spans share one trace id; span ids and names are numbered from zero.
    pub fn trace_spans(num_spans: usize) -> Vec<v1::Span> {
        let now_ns = now_nanos();
        let finish_ns = now_ns + 1_000_000;
        (0..num_spans)
            .map(|i| v1::Span {
                trace_id: vec![1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
                span_id: (i as u64 + 1).to_be_bytes().to_vec(),
                trace_state: "rojo=00f067aa0ba902b7".to_string(),
                parent_span_id: vec![1, 1, 1, 1, 1, 1, 1, 1],
                name: format!("span-{}", i),
                kind: SpanKind::Internal.into(),
                start_time_unix_nano: now_ns,
                end_time_unix_nano: finish_ns,
                attributes: vec![
                    string_attr("http.method", "POST"),
                    string_attr("http.request.path", "/items"),
                ],
                status: Some(Status::default()),
                ..Default::default()
            })
            .collect()
    }

    fn resource() -> Resource {
        Resource {
            attributes: vec![
                string_attr("service.name", "test-service"),
                string_attr("telemetry.sdk.version", "1.13.0"),
                string_attr("telemetry.sdk.name", "open-telemetry"),
                string_attr("k8s.pod.uid", "dc2c3e55-0dfb-4fda-854c-f7a1e5f88fd6"),
                string_attr("k8s.node.name", "ip-10-250-64-50.ec2.internal"),
                string_attr(
                    "container.id",
                    "b1e5232f92b315b7d91052e2c1b09de3735bea5b51c983a2a81ff3d69dfd0359",
                ),
            ],
            ..Default::default()
        }
    }
}

fn now_nanos() -> u64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64
}

pub fn string_attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue {
            value: Some(StringValue(value.to_string())),
        }),
    }
}
