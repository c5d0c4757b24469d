// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::config::{KafkaExporterConfig, SerializationFormat};
use crate::exporters::kafka::errors::{KafkaExportError, MarshalError, Result};
use crate::exporters::kafka::exporter::KafkaExportable;
use crate::exporters::kafka::jaeger::JaegerMarshaler;
use crate::exporters::kafka::message::KafkaMessage;
use crate::exporters::kafka::request_builder::KafkaRequestBuilder;
use crate::topology::batch::BatchSizer;
use opentelemetry_proto::tonic::logs::v1::ResourceLogs;
use opentelemetry_proto::tonic::metrics::v1::ResourceMetrics;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use std::collections::HashMap;
use std::sync::Arc;

pub const OTLP_PROTO: &str = "otlp_proto";
pub const OTLP_JSON: &str = "otlp_json";

/// Turns a batch of telemetry into Kafka messages.
pub trait Marshaler<Resource>: Send + Sync {
    fn marshal(
        &self,
        batch: &[Resource],
        config: &KafkaExporterConfig,
    ) -> std::result::Result<Vec<KafkaMessage>, MarshalError>;

    /// Name the marshaler is registered under
    fn encoding(&self) -> &'static str;
}

/// Marshalers available for one telemetry type, by encoding name
pub struct MarshalerRegistry<Resource> {
    marshalers: HashMap<&'static str, Arc<dyn Marshaler<Resource>>>,
}

impl<Resource> MarshalerRegistry<Resource> {
    pub fn new() -> Self {
        Self {
            marshalers: HashMap::new(),
        }
    }

    pub fn with<M>(mut self, marshaler: M) -> Self
    where
        M: Marshaler<Resource> + 'static,
    {
        self.marshalers
            .insert(marshaler.encoding(), Arc::new(marshaler));
        self
    }

    pub fn get(&self, encoding: &str) -> Result<Arc<dyn Marshaler<Resource>>> {
        self.marshalers
            .get(encoding)
            .cloned()
            .ok_or_else(|| KafkaExportError::UnrecognizedEncoding(encoding.to_string()))
    }

    /// Registered encoding names, sorted
    pub fn encodings(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.marshalers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<Resource> Default for MarshalerRegistry<Resource> {
    fn default() -> Self {
        Self::new()
    }
}

pub fn traces_marshalers() -> MarshalerRegistry<ResourceSpans> {
    MarshalerRegistry::new()
        .with(OtlpMarshaler::proto())
        .with(OtlpMarshaler::json())
        .with(JaegerMarshaler::proto())
        .with(JaegerMarshaler::json())
}

pub fn metrics_marshalers() -> MarshalerRegistry<ResourceMetrics> {
    MarshalerRegistry::new()
        .with(OtlpMarshaler::proto())
        .with(OtlpMarshaler::json())
}

pub fn logs_marshalers() -> MarshalerRegistry<ResourceLogs> {
    MarshalerRegistry::new()
        .with(OtlpMarshaler::proto())
        .with(OtlpMarshaler::json())
}

/// OTLP export requests. The whole batch is one message unless the config asks to
/// partition it by trace id or resource attributes.
#[derive(Clone)]
pub struct OtlpMarshaler<Resource> {
    builder: KafkaRequestBuilder<Resource>,
}

impl<Resource> OtlpMarshaler<Resource>
where
    Resource: KafkaExportable,
{
    pub fn proto() -> Self {
        Self {
            builder: KafkaRequestBuilder::new(SerializationFormat::Protobuf),
        }
    }

    pub fn json() -> Self {
        Self {
            builder: KafkaRequestBuilder::new(SerializationFormat::Json),
        }
    }
}

impl<Resource> Marshaler<Resource> for OtlpMarshaler<Resource>
where
    Resource: KafkaExportable,
{
    fn marshal(
        &self,
        batch: &[Resource],
        config: &KafkaExporterConfig,
    ) -> std::result::Result<Vec<KafkaMessage>, MarshalError> {
        Resource::split_for_partitioning(config, batch)
            .into_iter()
            .map(|(key, part)| {
                let payload = self.builder.build_message(&part)?;
                Ok(KafkaMessage::new(key, payload, part.size_of()))
            })
            .collect()
    }

    fn encoding(&self) -> &'static str {
        match self.builder.serialization_format() {
            SerializationFormat::Protobuf => OTLP_PROTO,
            SerializationFormat::Json => OTLP_JSON,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporters::kafka::jaeger::{JAEGER_JSON, JAEGER_PROTO};

    #[test]
    fn test_registered_encodings() {
        assert_eq!(
            vec![JAEGER_JSON, JAEGER_PROTO, OTLP_JSON, OTLP_PROTO],
            traces_marshalers().encodings()
        );
        assert_eq!(vec![OTLP_JSON, OTLP_PROTO], metrics_marshalers().encodings());
        assert_eq!(vec![OTLP_JSON, OTLP_PROTO], logs_marshalers().encodings());
    }

    #[test]
    fn test_lookup() {
        let m = traces_marshalers().get(JAEGER_JSON).unwrap();
        assert_eq!(JAEGER_JSON, m.encoding());

        let err = logs_marshalers().get(JAEGER_PROTO).err().unwrap();
        assert!(matches!(err, KafkaExportError::UnrecognizedEncoding(ref e) if e == JAEGER_PROTO));
        assert_eq!("unrecognized encoding: jaeger_proto", err.to_string());
    }
}
