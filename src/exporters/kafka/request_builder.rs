// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::config::SerializationFormat;
use crate::exporters::kafka::errors::MarshalError;
use crate::exporters::kafka::exporter::KafkaExportable;
use bytes::Bytes;
use serde::Serialize;
use serde::ser::SerializeMap;

// Resource lists are field 1 of every OTLP export request
const RESOURCES_FIELD_TAG: u32 = 1;

/// Builds OTLP export request payloads from a slice of resources
#[derive(Clone)]
pub struct KafkaRequestBuilder<Resource> {
    serialization_format: SerializationFormat,
    _phantom: std::marker::PhantomData<Resource>,
}

impl<Resource> KafkaRequestBuilder<Resource>
where
    Resource: KafkaExportable,
{
    /// Create a new request builder
    pub fn new(format: SerializationFormat) -> Self {
        Self {
            serialization_format: format,
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn serialization_format(&self) -> SerializationFormat {
        self.serialization_format
    }

    /// Build message from telemetry resources
    pub fn build_message(&self, resources: &[Resource]) -> Result<Bytes, MarshalError> {
        let payload = match self.serialization_format {
            SerializationFormat::Json => self.serialize_json(resources)?,
            SerializationFormat::Protobuf => self.serialize_protobuf(resources),
        };
        Ok(payload)
    }

    /// Serialize as an OTLP/JSON export request object
    fn serialize_json(&self, resources: &[Resource]) -> Result<Bytes, MarshalError> {
        let json = serde_json::to_vec(&JsonRequest(resources))?;
        Ok(Bytes::from(json))
    }

    /// Serialize as an OTLP export request, byte-identical to encoding the request message
    fn serialize_protobuf(&self, resources: &[Resource]) -> Bytes {
        let len: usize = resources
            .iter()
            .map(|r| prost::encoding::message::encoded_len(RESOURCES_FIELD_TAG, r))
            .sum();

        let mut buf = Vec::with_capacity(len);
        for resource in resources {
            prost::encoding::message::encode(RESOURCES_FIELD_TAG, resource, &mut buf);
        }
        Bytes::from(buf)
    }
}

struct JsonRequest<'a, Resource>(&'a [Resource]);

impl<Resource> Serialize for JsonRequest<'_, Resource>
where
    Resource: KafkaExportable,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(Resource::OTLP_JSON_FIELD, self.0)?;
        map.end()
    }
}
