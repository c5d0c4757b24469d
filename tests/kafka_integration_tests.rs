// SPDX-License-Identifier: Apache-2.0

//! Kafka Integration Tests
//!
//! These tests require a running Kafka instance listening on localhost:9092.
//!
//! To run these tests:
//! cargo test --test kafka_integration_tests --features integration-tests

#![cfg(feature = "integration-tests")]

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message as _;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rotel_kafka_exporter::exporters::kafka::config::KafkaExporterConfig;
use rotel_kafka_exporter::exporters::kafka::{
    build_logs_exporter, build_metrics_exporter, build_traces_exporter,
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use utilities::otlp::FakeOTLP;

const KAFKA_BROKER: &str = "localhost:9092";
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

fn generate_unique_topic(base: &str) -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("{}-{}", base, uuid)
}

fn setup_consumer(topic: &str) -> StreamConsumer {
    let consumer: StreamConsumer = ClientConfig::new()
        .set(
            "group.id",
            format!("test-consumer-{}", uuid::Uuid::new_v4()),
        )
        .set("bootstrap.servers", KAFKA_BROKER)
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .create()
        .expect("Consumer creation failed");

    consumer
        .subscribe(&[topic])
        .expect("Failed to subscribe to topic");

    consumer
}

/// Collects up to `count` messages as (key, payload) pairs
async fn wait_for_messages(
    consumer: &StreamConsumer,
    count: usize,
    timeout_duration: Duration,
) -> Vec<(Option<String>, Vec<u8>)> {
    let mut received = Vec::new();
    let _ = timeout(timeout_duration, async {
        while received.len() < count {
            match consumer.recv().await {
                Ok(m) => {
                    let key = m.key().map(|k| String::from_utf8_lossy(k).to_string());
                    let payload = m.payload().map(|p| p.to_vec()).unwrap_or_default();
                    received.push((key, payload));
                }
                Err(e) => {
                    eprintln!("Error receiving message: {}", e);
                    sleep(Duration::from_millis(100)).await;
                }
            }
        }
    })
    .await;
    received
}

#[tokio::test]
async fn test_kafka_exporter_traces_json() {
    let topic = generate_unique_topic("otlp_spans");
    let consumer = setup_consumer(&topic);
    sleep(Duration::from_secs(2)).await;

    let config = KafkaExporterConfig::new(KAFKA_BROKER.to_string())
        .with_traces_topic(topic.clone())
        .with_encoding("otlp_json");
    let exporter = build_traces_exporter(config).expect("Failed to create Kafka traces exporter");

    let batch = FakeOTLP::trace_service_request().resource_spans;
    exporter
        .push(batch, &CancellationToken::new())
        .await
        .expect("push failed");

    let messages = wait_for_messages(&consumer, 1, TEST_TIMEOUT).await;
    assert_eq!(1, messages.len(), "No message received from Kafka");

    let json: Value = serde_json::from_slice(&messages[0].1).expect("Message is not valid JSON");
    let spans = json["resourceSpans"]
        .as_array()
        .expect("resourceSpans should be an array");
    assert_eq!(1, spans.len());
    assert!(spans[0].get("scopeSpans").is_some());

    exporter.close().expect("close failed");
}

#[tokio::test]
async fn test_kafka_exporter_splits_oversized_traces() {
    let topic = generate_unique_topic("otlp_spans");
    let consumer = setup_consumer(&topic);
    sleep(Duration::from_secs(2)).await;

    let batch = FakeOTLP::trace_service_request_with_spans(1, 50).resource_spans;
    let full_size = ExportTraceServiceRequest {
        resource_spans: batch.clone(),
    }
    .encoded_len();

    let config = KafkaExporterConfig::new(KAFKA_BROKER.to_string())
        .with_traces_topic(topic.clone())
        .with_max_message_bytes(full_size / 3);
    let exporter = build_traces_exporter(config).expect("Failed to create Kafka traces exporter");

    exporter
        .push(batch, &CancellationToken::new())
        .await
        .expect("push failed");

    // At least three messages are needed to fit a third of the payload each
    let messages = wait_for_messages(&consumer, 3, TEST_TIMEOUT).await;
    assert!(messages.len() >= 3);
    for (_, payload) in &messages {
        assert!(payload.len() <= full_size / 3);
        ExportTraceServiceRequest::decode(payload.as_slice()).expect("invalid protobuf payload");
    }

    exporter.close().expect("close failed");
}

#[tokio::test]
async fn test_kafka_exporter_jaeger_keys_by_trace_id() {
    let topic = generate_unique_topic("jaeger_spans");
    let consumer = setup_consumer(&topic);
    sleep(Duration::from_secs(2)).await;

    let config = KafkaExporterConfig::new(KAFKA_BROKER.to_string())
        .with_traces_topic(topic.clone())
        .with_encoding("jaeger_json");
    let exporter = build_traces_exporter(config).expect("Failed to create Kafka traces exporter");

    let batch = FakeOTLP::trace_service_request_with_spans(1, 2).resource_spans;
    exporter
        .push(batch, &CancellationToken::new())
        .await
        .expect("push failed");

    let messages = wait_for_messages(&consumer, 2, TEST_TIMEOUT).await;
    assert_eq!(2, messages.len());
    for (key, payload) in &messages {
        assert_eq!(Some("1010101010101010101010101010101"), key.as_deref());
        let json: Value = serde_json::from_slice(payload).expect("Message is not valid JSON");
        assert!(json.get("process").is_some());
    }

    exporter.close().expect("close failed");
}

#[tokio::test]
async fn test_kafka_exporter_metrics_and_logs() {
    let metrics_topic = generate_unique_topic("otlp_metrics");
    let logs_topic = generate_unique_topic("otlp_logs");
    let metrics_consumer = setup_consumer(&metrics_topic);
    let logs_consumer = setup_consumer(&logs_topic);
    sleep(Duration::from_secs(2)).await;

    let metrics_exporter = build_metrics_exporter(
        KafkaExporterConfig::new(KAFKA_BROKER.to_string())
            .with_metrics_topic(metrics_topic.clone())
            .with_partition_metrics_by_resource_attributes(true),
    )
    .expect("Failed to create Kafka metrics exporter");
    let logs_exporter = build_logs_exporter(
        KafkaExporterConfig::new(KAFKA_BROKER.to_string())
            .with_logs_topic(logs_topic.clone())
            .with_encoding("otlp_json")
            .with_compression("gzip".to_string()),
    )
    .expect("Failed to create Kafka logs exporter");

    let cancel_token = CancellationToken::new();
    metrics_exporter
        .push(
            FakeOTLP::metrics_service_request().resource_metrics,
            &cancel_token,
        )
        .await
        .expect("metrics push failed");
    logs_exporter
        .push(FakeOTLP::logs_service_request().resource_logs, &cancel_token)
        .await
        .expect("logs push failed");

    let metrics = wait_for_messages(&metrics_consumer, 1, TEST_TIMEOUT).await;
    assert_eq!(1, metrics.len());
    assert!(metrics[0].0.is_some(), "metrics should be keyed by resource");

    let logs = wait_for_messages(&logs_consumer, 1, TEST_TIMEOUT).await;
    assert_eq!(1, logs.len());
    let json: Value = serde_json::from_slice(&logs[0].1).expect("Message is not valid JSON");
    assert!(json["resourceLogs"].is_array());

    metrics_exporter.close().expect("close failed");
    logs_exporter.close().expect("close failed");
}
