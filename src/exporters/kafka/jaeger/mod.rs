// SPDX-License-Identifier: Apache-2.0

//! Jaeger encodings for traces: one Kafka message per span, keyed by trace id.

pub mod model;
pub mod translator;

use crate::exporters::kafka::config::{KafkaExporterConfig, SerializationFormat};
use crate::exporters::kafka::errors::MarshalError;
use crate::exporters::kafka::marshaler::Marshaler;
use crate::exporters::kafka::message::KafkaMessage;
use bytes::Bytes;
use opentelemetry_proto::tonic::trace::v1::ResourceSpans;
use prost::Message;

pub const JAEGER_PROTO: &str = "jaeger_proto";
pub const JAEGER_JSON: &str = "jaeger_json";

/// Emits every span as a standalone Jaeger span with its process embedded.
#[derive(Clone, Debug)]
pub struct JaegerMarshaler {
    format: SerializationFormat,
}

impl JaegerMarshaler {
    pub fn proto() -> Self {
        Self {
            format: SerializationFormat::Protobuf,
        }
    }

    pub fn json() -> Self {
        Self {
            format: SerializationFormat::Json,
        }
    }

    fn encode(&self, span: &model::Span) -> Result<Bytes, MarshalError> {
        match self.format {
            SerializationFormat::Protobuf => {
                let mut buf = Vec::with_capacity(span.encoded_len());
                span.encode(&mut buf)?;
                Ok(Bytes::from(buf))
            }
            SerializationFormat::Json => Ok(Bytes::from(serde_json::to_vec(span)?)),
        }
    }
}

impl Marshaler<ResourceSpans> for JaegerMarshaler {
    fn marshal(
        &self,
        batch: &[ResourceSpans],
        _config: &KafkaExporterConfig,
    ) -> Result<Vec<KafkaMessage>, MarshalError> {
        let mut messages = Vec::new();
        for rs in batch {
            let process = translator::process_from_resource(rs.resource.as_ref());
            for ss in &rs.scope_spans {
                for span in &ss.spans {
                    let key = translator::trace_id(&span.trace_id)?.to_string();
                    let mut jaeger_span = translator::span_to_jaeger(span, ss.scope.as_ref())?;
                    jaeger_span.process = Some(process.clone());

                    let payload = self.encode(&jaeger_span)?;
                    messages.push(KafkaMessage::new(Some(key), payload, 1));
                }
            }
        }
        Ok(messages)
    }

    fn encoding(&self) -> &'static str {
        match self.format {
            SerializationFormat::Protobuf => JAEGER_PROTO,
            SerializationFormat::Json => JAEGER_JSON,
        }
    }
}
