// SPDX-License-Identifier: Apache-2.0

use rdkafka::error::KafkaError;
use thiserror::Error;

/// Errors that can occur during Kafka export operations
#[derive(Error, Debug)]
pub enum KafkaExportError {
    /// A sub-batch could not be encoded
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// A single record encodes to a message over the size limit
    #[error("single kafka message of {size} bytes exceeds max message bytes {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// The broker client rejected a message
    #[error(transparent)]
    Send(#[from] SendError),

    /// No marshaler with this name for the telemetry type
    #[error("unrecognized encoding: {0}")]
    UnrecognizedEncoding(String),

    /// Protocol version is malformed or older than the minimum supported
    #[error("invalid kafka protocol version: {0}")]
    InvalidProtocolVersion(String),

    /// Configuration error
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    /// Topic not configured
    #[error("Topic not configured for telemetry type: {0}")]
    TopicNotConfigured(String),

    /// The push was cancelled before every message was sent
    #[error("push cancelled")]
    Cancelled,
}

/// Encoding failures reported by a marshaler
#[derive(Error, Debug)]
pub enum MarshalError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Protobuf encoding error: {0}")]
    Protobuf(#[from] prost::EncodeError),

    /// The record can't be expressed in the target model
    #[error("translation error: {0}")]
    Translation(String),
}

/// Failures sending a single message
#[derive(Error, Debug)]
pub enum SendError {
    /// Error from Kafka producer
    #[error("Kafka producer error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("broker error: {0}")]
    Broker(String),
}

impl From<(KafkaError, rdkafka::message::OwnedMessage)> for SendError {
    fn from((error, _): (KafkaError, rdkafka::message::OwnedMessage)) -> Self {
        SendError::Kafka(error)
    }
}

/// Result type for Kafka export operations
pub type Result<T> = std::result::Result<T, KafkaExportError>;
