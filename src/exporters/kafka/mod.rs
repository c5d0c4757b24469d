// SPDX-License-Identifier: Apache-2.0

//! Kafka exporter implementation.
//!
//! This module provides functionality for exporting telemetry data to Apache Kafka.
//! It supports sending traces, metrics, and logs to Kafka topics using the rdkafka library,
//! while keeping every produced message under the configured `max_message_bytes`.
//!
//! # Features
//!
//! - Support for traces, metrics, and logs
//! - Configurable topic names for each telemetry type
//! - Pluggable encodings: OTLP protobuf and JSON for every signal, Jaeger protobuf and JSON
//!   for traces
//! - Oversized batches are split by record count until every message fits
//! - Optional partitioning by trace id or resource attributes
//! - Producer configuration options
//!
//! # Modules
//!
//! - `config`: Configuration structures for Kafka exporter
//! - `errors`: Error types specific to Kafka export operations
//! - `exporter`: Size-bounded push of a batch to a topic
//! - `marshaler`: Encoding registry and the OTLP marshaler
//! - `jaeger`: Jaeger model, OTLP translation and the per-span marshaler
//! - `client`: Broker client abstraction over the rdkafka producer

pub mod client;
pub mod config;
pub mod errors;
pub mod exporter;
pub mod jaeger;
pub mod marshaler;
pub mod message;
pub mod partitioning;
pub mod request_builder;


pub use client::{BrokerClient, RdKafkaClient};
pub use config::KafkaExporterConfig;
pub use errors::{KafkaExportError, MarshalError, SendError};
pub use exporter::{
    KafkaExportable, KafkaExporter, build_logs_exporter, build_metrics_exporter,
    build_traces_exporter,
};
pub use message::KafkaMessage;
