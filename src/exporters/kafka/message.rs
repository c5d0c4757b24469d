// SPDX-License-Identifier: Apache-2.0

use bytes::Bytes;

/// A single record ready to be produced to a topic
#[derive(Clone, Debug, PartialEq)]
pub struct KafkaMessage {
    /// Partitioning key. `None` leaves partition choice to the producer.
    pub key: Option<String>,
    pub payload: Bytes,
    /// Number of atomic telemetry records encoded in the payload
    pub record_count: usize,
}

impl KafkaMessage {
    pub fn new(key: Option<String>, payload: Bytes, record_count: usize) -> Self {
        Self {
            key,
            payload,
            record_count,
        }
    }

    /// Bytes this message occupies on the wire, given the per-message framing overhead
    pub fn byte_size(&self, overhead: usize) -> usize {
        overhead + self.key.as_ref().map_or(0, |k| k.len()) + self.payload.len()
    }
}
