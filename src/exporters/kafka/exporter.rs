// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::client::{BrokerClient, RdKafkaClient};
use crate::exporters::kafka::config::KafkaExporterConfig;
use crate::exporters::kafka::errors::{KafkaExportError, Result};
use crate::exporters::kafka::marshaler::{
    Marshaler, MarshalerRegistry, logs_marshalers, metrics_marshalers, traces_marshalers,
};
use crate::exporters::kafka::message::KafkaMessage;
use crate::exporters::kafka::partitioning::{group_by_trace_id, resource_attributes_key};
use crate::topology::batch::{BatchSizer, BatchSplittable};
use crate::topology::partition::partition_by_count;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A message key paired with the resources that go into that message
pub type KeyedPart<'a, Resource> = (Option<String>, Cow<'a, [Resource]>);

/// Trait for telemetry resources that can be exported to Kafka
pub trait KafkaExportable:
    prost::Message + Serialize + Clone + BatchSizer + BatchSplittable + Sized + 'static
{
    /// Field holding the resource list in an OTLP/JSON export request
    const OTLP_JSON_FIELD: &'static str;

    /// Get the telemetry type name
    fn telemetry_type() -> &'static str;

    /// Encodings available for this telemetry type
    fn marshalers() -> MarshalerRegistry<Self>;

    /// Split a batch into the parts that become separate OTLP messages.
    /// Default implementation keeps the batch whole and unkeyed.
    fn split_for_partitioning<'a>(
        _config: &KafkaExporterConfig,
        batch: &'a [Self],
    ) -> Vec<KeyedPart<'a, Self>> {
        vec![(None, Cow::Borrowed(batch))]
    }
}

// Every resource with records becomes its own message, keyed by its attributes
fn split_by_resource<'a, Resource, F>(batch: &'a [Resource], key: F) -> Vec<KeyedPart<'a, Resource>>
where
    Resource: KafkaExportable,
    F: Fn(&Resource) -> Option<String>,
{
    batch
        .iter()
        .filter(|r| r.size_of() > 0)
        .map(|r| (key(r), Cow::Borrowed(std::slice::from_ref(r))))
        .collect()
}

impl KafkaExportable for ResourceSpans {
    const OTLP_JSON_FIELD: &'static str = "resourceSpans";

    fn telemetry_type() -> &'static str {
        "traces"
    }

    fn marshalers() -> MarshalerRegistry<Self> {
        traces_marshalers()
    }

    /// One message per trace when partition_traces_by_id is enabled
    fn split_for_partitioning<'a>(
        config: &KafkaExporterConfig,
        batch: &'a [Self],
    ) -> Vec<KeyedPart<'a, Self>> {
        if !config.partition_traces_by_id {
            return vec![(None, Cow::Borrowed(batch))];
        }
        group_by_trace_id(batch)
            .into_iter()
            .map(|(key, resources)| (Some(key), Cow::Owned(resources)))
            .collect()
    }
}

impl KafkaExportable for ResourceMetrics {
    const OTLP_JSON_FIELD: &'static str = "resourceMetrics";

    fn telemetry_type() -> &'static str {
        "metrics"
    }

    fn marshalers() -> MarshalerRegistry<Self> {
        metrics_marshalers()
    }

    fn split_for_partitioning<'a>(
        config: &KafkaExporterConfig,
        batch: &'a [Self],
    ) -> Vec<KeyedPart<'a, Self>> {
        if !config.partition_metrics_by_resource_attributes {
            return vec![(None, Cow::Borrowed(batch))];
        }
        split_by_resource(batch, |rm| resource_attributes_key(rm.resource.as_ref()))
    }
}

impl KafkaExportable for ResourceLogs {
    const OTLP_JSON_FIELD: &'static str = "resourceLogs";

    fn telemetry_type() -> &'static str {
        "logs"
    }

    fn marshalers() -> MarshalerRegistry<Self> {
        logs_marshalers()
    }

    fn split_for_partitioning<'a>(
        config: &KafkaExporterConfig,
        batch: &'a [Self],
    ) -> Vec<KeyedPart<'a, Self>> {
        if !config.partition_logs_by_resource_attributes {
            return vec![(None, Cow::Borrowed(batch))];
        }
        split_by_resource(batch, |rl| resource_attributes_key(rl.resource.as_ref()))
    }
}

/// Pushes telemetry batches to a single topic, splitting them so every message fits within
/// `max_message_bytes`.
pub struct KafkaExporter<Resource, Client = RdKafkaClient>
where
    Resource: KafkaExportable,
{
    config: KafkaExporterConfig,
    topic: String,
    client: Client,
    marshaler: Arc<dyn Marshaler<Resource>>,
    message_overhead: usize,
}

impl<Resource, Client> Debug for KafkaExporter<Resource, Client>
where
    Resource: KafkaExportable,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaExporter")
            .field("config", &self.config)
            .field("topic", &self.topic)
            .field("telemetry_type", &Resource::telemetry_type())
            .field("encoding", &self.marshaler.encoding())
            .finish_non_exhaustive()
    }
}

impl<Resource, Client> KafkaExporter<Resource, Client>
where
    Resource: KafkaExportable,
    Client: BrokerClient,
{
    /// Create a new Kafka exporter using the marshaler named by `config.encoding`
    pub fn new(config: KafkaExporterConfig, topic: String, client: Client) -> Result<Self> {
        let marshaler = Resource::marshalers().get(&config.encoding)?;
        Self::with_marshaler(config, topic, client, marshaler)
    }

    /// Create a new Kafka exporter with an explicit marshaler, `config.encoding` is ignored
    pub fn with_marshaler(
        config: KafkaExporterConfig,
        topic: String,
        client: Client,
        marshaler: Arc<dyn Marshaler<Resource>>,
    ) -> Result<Self> {
        let version = config.validate()?;
        let message_overhead = config.message_overhead(version);

        info!(
            "Created Kafka {} exporter with brokers: {} topic: {} encoding: {} protocol version: {}",
            Resource::telemetry_type(),
            config.brokers,
            topic,
            marshaler.encoding(),
            version
        );

        Ok(Self {
            config,
            topic,
            client,
            marshaler,
            message_overhead,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn encoding(&self) -> &'static str {
        self.marshaler.encoding()
    }

    pub fn config(&self) -> &KafkaExporterConfig {
        &self.config
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Framing bytes counted against `max_message_bytes` for every message
    pub fn message_overhead(&self) -> usize {
        self.message_overhead
    }

    /// Marshals, size checks and sends `batch`. Nothing is sent unless every message fits.
    /// Messages are sent one at a time and the first failure stops the push.
    pub async fn push(&self, batch: Vec<Resource>, cancel_token: &CancellationToken) -> Result<()> {
        let telemetry_type = Resource::telemetry_type();
        let record_count = batch.size_of();
        if record_count == 0 {
            debug!("Skipping empty {} batch", telemetry_type);
            return Ok(());
        }

        let messages = self.prepare(batch)?;
        debug!(
            "Sending {} {} records in {} messages to topic {}",
            record_count,
            telemetry_type,
            messages.len(),
            self.topic
        );

        for message in &messages {
            select! {
                biased;

                _ = cancel_token.cancelled() => {
                    info!("Kafka {} push cancelled", telemetry_type);
                    return Err(KafkaExportError::Cancelled);
                }

                result = self.client.send(&self.topic, message) => result?,
            }
        }

        Ok(())
    }

    /// Marshals `batch` into messages that each fit within `max_message_bytes`.
    ///
    /// A batch with an oversized message is cut into sub-batches of at most
    /// `max_message_bytes * records / size` records and every sub-batch is marshaled again.
    /// Fails with `MessageTooLarge` when an oversized message holds a single record.
    pub fn prepare(&self, batch: Vec<Resource>) -> Result<Vec<KafkaMessage>> {
        let max = self.config.max_message_bytes;
        let mut ready = Vec::new();

        // Popped from the back, so sub-batches are pushed in reverse.
        let mut pending = vec![batch];
        while let Some(batch) = pending.pop() {
            let messages = self.marshaler.marshal(&batch, &self.config)?;

            let oversized = messages
                .iter()
                .map(|m| (m, m.byte_size(self.message_overhead)))
                .find(|(_, size)| *size > max);

            let Some((message, size)) = oversized else {
                ready.extend(messages);
                continue;
            };

            if message.record_count <= 1 {
                return Err(KafkaExportError::MessageTooLarge { size, max });
            }

            let max_unit_count = estimate_max_records(max, message.record_count, size);
            warn!(
                "Kafka {} message of {} bytes holding {} records exceeds {} bytes, splitting into sub-batches of at most {} records",
                Resource::telemetry_type(),
                size,
                message.record_count,
                max,
                max_unit_count
            );

            let mut parts = partition_by_count(batch, max_unit_count, max_unit_count);
            parts.reverse();
            pending.extend(parts);
        }

        Ok(ready)
    }

    /// Flushes the client.
    pub fn close(&self) -> Result<()> {
        debug!("Flushing Kafka {} producer", Resource::telemetry_type());
        self.client.close()?;
        info!("Kafka {} exporter stopped", Resource::telemetry_type());
        Ok(())
    }
}

/// Records per message expected to fit in `max_bytes`, assuming records of uniform size.
/// Always at least one and always fewer than `records`.
fn estimate_max_records(max_bytes: usize, records: usize, size: usize) -> usize {
    let estimate = (max_bytes as u128 * records as u128 / size.max(1) as u128) as usize;
    estimate.clamp(1, records.saturating_sub(1).max(1))
}

fn build_exporter<Resource>(
    config: KafkaExporterConfig,
    topic: Option<String>,
) -> Result<KafkaExporter<Resource>>
where
    Resource: KafkaExportable,
{
    let topic = topic
        .ok_or_else(|| KafkaExportError::TopicNotConfigured(Resource::telemetry_type().to_string()))?;
    let marshaler = Resource::marshalers().get(&config.encoding)?;

    // Surface configuration errors before librdkafka sees the settings
    config.validate()?;
    let client = RdKafkaClient::new(&config)?;

    KafkaExporter::with_marshaler(config, topic, client, marshaler)
}

// Builder functions for creating specific exporter types

/// Creates a Kafka traces exporter
pub fn build_traces_exporter(config: KafkaExporterConfig) -> Result<KafkaExporter<ResourceSpans>> {
    let topic = config.traces_topic.clone();
    build_exporter(config, topic)
}

/// Creates a Kafka metrics exporter
pub fn build_metrics_exporter(
    config: KafkaExporterConfig,
) -> Result<KafkaExporter<ResourceMetrics>> {
    let topic = config.metrics_topic.clone();
    build_exporter(config, topic)
}

/// Creates a Kafka logs exporter
pub fn build_logs_exporter(config: KafkaExporterConfig) -> Result<KafkaExporter<ResourceLogs>> {
    let topic = config.logs_topic.clone();
    build_exporter(config, topic)
}
