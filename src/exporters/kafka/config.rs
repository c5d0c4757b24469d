// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::errors::{KafkaExportError, Result};
use rdkafka::ClientConfig;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Encoding used when none is configured
pub const DEFAULT_ENCODING: &str = "otlp_proto";

/// Protocol version assumed when none is configured
pub const DEFAULT_PROTOCOL_VERSION: &str = "2.0.0";

const SUPPORTED_COMPRESSION: [&str; 5] = ["none", "gzip", "snappy", "lz4", "zstd"];

// Range librdkafka accepts for message.max.bytes
const LIBRDKAFKA_MESSAGE_MAX_BYTES: (usize, usize) = (1_000, 1_000_000_000);

/// Serialization format for the OTLP and Jaeger encodings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// JSON format
    Json,
    /// Protobuf format
    #[default]
    Protobuf,
}

/// Kafka acknowledgement configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AcknowledgementMode {
    /// No acknowledgement required (acks=0) - fastest but least durable
    None,
    /// Wait for leader acknowledgement only (acks=1) - middle ground
    #[default]
    One,
    /// Wait for all in-sync replicas to acknowledge (acks=all) - slowest but most durable
    All,
}

impl AcknowledgementMode {
    /// Convert to the string value expected by librdkafka
    pub fn to_kafka_value(&self) -> &'static str {
        match self {
            AcknowledgementMode::None => "0",
            AcknowledgementMode::One => "1",
            AcknowledgementMode::All => "all",
        }
    }
}

/// Kafka partitioner type. Decides the partition of keyed messages.
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionerType {
    /// Consistent hash partitioner
    Consistent,
    /// Consistent hashing, random partition for unkeyed messages
    ConsistentRandom,
    /// Murmur2 hashing, random partition for unkeyed messages
    Murmur2Random,
    /// Murmur2 hash partitioner (Java client compatible)
    Murmur2,
    /// FNV-1a hash partitioner
    Fnv1a,
    /// FNV-1a hashing, random partition for unkeyed messages
    Fnv1aRandom,
}

impl PartitionerType {
    /// Convert to the string value expected by librdkafka
    pub fn to_kafka_value(&self) -> &'static str {
        match self {
            PartitionerType::Consistent => "consistent",
            PartitionerType::ConsistentRandom => "consistent_random",
            PartitionerType::Murmur2Random => "murmur2_random",
            PartitionerType::Murmur2 => "murmur2",
            PartitionerType::Fnv1a => "fnv1a",
            PartitionerType::Fnv1aRandom => "fnv1a_random",
        }
    }
}

/// Kafka protocol version of the target cluster.
///
/// Only the first three components are significant, `0.8.2.0` and `0.8.2` compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct KafkaVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl KafkaVersion {
    /// Oldest broker version a producer can talk to
    pub const MIN: KafkaVersion = KafkaVersion::new(0, 8, 2);

    /// First version to use the record batch (magic 2) format
    pub const RECORD_BATCH: KafkaVersion = KafkaVersion::new(0, 11, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(version: &str) -> Result<Self> {
        let invalid = || KafkaExportError::InvalidProtocolVersion(version.to_string());

        let parts = version
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        if parts.len() != 3 && parts.len() != 4 {
            return Err(invalid());
        }

        let parsed = KafkaVersion::new(parts[0], parts[1], parts[2]);
        if parsed < Self::MIN {
            return Err(invalid());
        }
        Ok(parsed)
    }

    /// Worst case bytes a single message adds on top of its key and value.
    pub fn message_overhead(&self) -> usize {
        if *self >= Self::RECORD_BATCH {
            // length, attributes, timestamp delta, offset delta, key and value lengths as
            // varints, plus the header count
            36
        } else {
            // crc, magic, attributes, timestamp, key and value lengths, offset and size
            26
        }
    }
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Configuration for the Kafka exporter
#[derive(Clone, Debug)]
pub struct KafkaExporterConfig {
    /// Kafka broker addresses (comma-separated)
    pub brokers: String,

    /// Topic name for traces
    pub traces_topic: Option<String>,

    /// Topic name for metrics
    pub metrics_topic: Option<String>,

    /// Topic name for logs
    pub logs_topic: Option<String>,

    /// Wire encoding name, e.g. `otlp_proto` or `jaeger_json`
    pub encoding: String,

    /// Kafka protocol version of the cluster, e.g. `2.0.0`
    pub protocol_version: String,

    /// Per-message framing overhead. Derived from the protocol version when unset.
    pub protocol_overhead_bytes: Option<usize>,

    /// Acknowledgement mode for producer
    pub acks: AcknowledgementMode,

    /// Client ID for the Kafka producer
    pub client_id: String,

    /// Maximum size of a single produced message in bytes
    pub max_message_bytes: usize,

    /// Linger time in milliseconds (queue.buffering.max.ms)
    pub linger_ms: u32,

    /// Number of retries (message.send.max.retries)
    pub retries: u32,

    /// Retry backoff time in milliseconds
    pub retry_backoff_ms: u32,

    /// Message timeout in milliseconds
    pub message_timeout_ms: u32,

    /// Maximum time to wait for a single send to be delivered
    pub request_timeout: Duration,

    /// Partitioner type
    pub partitioner: Option<PartitionerType>,

    /// Send one message per trace, keyed by trace id (OTLP encodings)
    pub partition_traces_by_id: bool,

    /// Send one message per resource, keyed by its attributes (OTLP encodings)
    pub partition_metrics_by_resource_attributes: bool,

    /// Send one message per resource, keyed by its attributes (OTLP encodings)
    pub partition_logs_by_resource_attributes: bool,

    /// Producer configuration options, override the built-in ones
    pub producer_config: HashMap<String, String>,

    /// Compression codec: none, gzip, snappy, lz4 or zstd
    pub compression: Option<String>,

    /// SASL username for authentication
    pub sasl_username: Option<String>,

    /// SASL password for authentication
    pub sasl_password: Option<String>,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    pub sasl_mechanism: Option<String>,

    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    pub security_protocol: Option<String>,

    /// CA certificate used to verify the brokers
    pub tls_ca_file: Option<PathBuf>,

    /// Client certificate
    pub tls_cert_file: Option<PathBuf>,

    /// Client private key
    pub tls_key_file: Option<PathBuf>,
}

impl Default for KafkaExporterConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            traces_topic: Some("otlp_spans".to_string()),
            metrics_topic: Some("otlp_metrics".to_string()),
            logs_topic: Some("otlp_logs".to_string()),
            encoding: DEFAULT_ENCODING.to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            protocol_overhead_bytes: None,
            acks: AcknowledgementMode::default(),
            client_id: "rotel".to_string(),
            max_message_bytes: 1_000_000,
            linger_ms: 5,
            retries: 3,
            retry_backoff_ms: 100,
            message_timeout_ms: 300_000,
            request_timeout: Duration::from_secs(30),
            partitioner: Some(PartitionerType::ConsistentRandom),
            partition_traces_by_id: false,
            partition_metrics_by_resource_attributes: false,
            partition_logs_by_resource_attributes: false,
            producer_config: HashMap::new(),
            compression: None,
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: None,
            security_protocol: None,
            tls_ca_file: None,
            tls_cert_file: None,
            tls_key_file: None,
        }
    }
}

impl KafkaExporterConfig {
    /// Create a new Kafka exporter configuration
    pub fn new(brokers: String) -> Self {
        Self {
            brokers,
            ..Default::default()
        }
    }

    /// Set the traces topic
    pub fn with_traces_topic(mut self, topic: String) -> Self {
        self.traces_topic = Some(topic);
        self
    }

    /// Set the metrics topic
    pub fn with_metrics_topic(mut self, topic: String) -> Self {
        self.metrics_topic = Some(topic);
        self
    }

    /// Set the logs topic
    pub fn with_logs_topic(mut self, topic: String) -> Self {
        self.logs_topic = Some(topic);
        self
    }

    /// Set the wire encoding
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Set the Kafka protocol version
    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Set compression type
    pub fn with_compression(mut self, compression: String) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Set acknowledgement mode
    pub fn with_acks(mut self, acks: AcknowledgementMode) -> Self {
        self.acks = acks;
        self
    }

    /// Set client ID
    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_id = client_id;
        self
    }

    /// Set maximum message size in bytes
    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Set linger time in milliseconds
    pub fn with_linger_ms(mut self, linger_ms: u32) -> Self {
        self.linger_ms = linger_ms;
        self
    }

    /// Set the send timeout
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Set partitioner type
    pub fn with_partitioner(mut self, partitioner: PartitionerType) -> Self {
        self.partitioner = Some(partitioner);
        self
    }

    /// Enable one message per trace id
    pub fn with_partition_traces_by_id(mut self, enabled: bool) -> Self {
        self.partition_traces_by_id = enabled;
        self
    }

    /// Enable partitioning metrics by resource attributes
    pub fn with_partition_metrics_by_resource_attributes(mut self, enabled: bool) -> Self {
        self.partition_metrics_by_resource_attributes = enabled;
        self
    }

    /// Enable partitioning logs by resource attributes
    pub fn with_partition_logs_by_resource_attributes(mut self, enabled: bool) -> Self {
        self.partition_logs_by_resource_attributes = enabled;
        self
    }

    /// Set custom producer configuration parameters
    pub fn with_custom_config(mut self, custom_config: Vec<(String, String)>) -> Self {
        for (key, value) in custom_config {
            self.producer_config.insert(key, value);
        }
        self
    }

    /// Set SASL authentication
    pub fn with_sasl_auth(
        mut self,
        username: String,
        password: String,
        mechanism: String,
        security_protocol: String,
    ) -> Self {
        self.sasl_username = Some(username);
        self.sasl_password = Some(password);
        self.sasl_mechanism = Some(mechanism);
        self.security_protocol = Some(security_protocol);
        self
    }

    /// Set TLS material. Any of the files may be omitted.
    pub fn with_tls(
        mut self,
        ca_file: Option<PathBuf>,
        cert_file: Option<PathBuf>,
        key_file: Option<PathBuf>,
    ) -> Self {
        self.tls_ca_file = ca_file;
        self.tls_cert_file = cert_file;
        self.tls_key_file = key_file;
        self
    }

    /// Checks the settings that can't be deferred to the broker and returns the parsed
    /// protocol version.
    pub fn validate(&self) -> Result<KafkaVersion> {
        if self.max_message_bytes == 0 {
            return Err(KafkaExportError::ConfigurationError(
                "max_message_bytes must be greater than zero".to_string(),
            ));
        }

        let version = KafkaVersion::parse(&self.protocol_version)?;

        if let Some(ref compression) = self.compression {
            if !SUPPORTED_COMPRESSION.contains(&compression.as_str()) {
                return Err(KafkaExportError::ConfigurationError(format!(
                    "producer.compression should be one of 'none', 'gzip', 'snappy', 'lz4', or 'zstd'. configured value {}",
                    compression
                )));
            }
        }

        for path in [&self.tls_ca_file, &self.tls_cert_file, &self.tls_key_file]
            .into_iter()
            .flatten()
        {
            std::fs::metadata(path).map_err(|e| {
                KafkaExportError::ConfigurationError(format!(
                    "failed to load TLS config: {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        Ok(version)
    }

    /// Framing bytes added to every message for the given protocol version.
    pub fn message_overhead(&self, version: KafkaVersion) -> usize {
        self.protocol_overhead_bytes
            .unwrap_or_else(|| version.message_overhead())
    }

    /// Build rdkafka ClientConfig from this configuration
    pub fn build_client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();

        config.set("bootstrap.servers", &self.brokers);
        config.set("client.id", &self.client_id);
        // Smaller limits are enforced by the exporter before librdkafka sees the message
        let (min_bytes, max_bytes) = LIBRDKAFKA_MESSAGE_MAX_BYTES;
        let message_max_bytes = self.max_message_bytes.clamp(min_bytes, max_bytes);
        config.set("message.max.bytes", message_max_bytes.to_string());
        config.set("broker.version.fallback", &self.protocol_version);

        config.set("linger.ms", self.linger_ms.to_string());
        config.set("retries", self.retries.to_string());
        config.set("retry.backoff.ms", self.retry_backoff_ms.to_string());
        config.set("acks", self.acks.to_kafka_value());

        if let Some(ref partitioner) = self.partitioner {
            config.set("partitioner", partitioner.to_kafka_value());
        }

        if let Some(ref compression) = self.compression {
            config.set("compression.type", compression);
        }

        if let Some(ref protocol) = self.security_protocol {
            config.set("security.protocol", protocol);
        }
        if let Some(ref mechanism) = self.sasl_mechanism {
            config.set("sasl.mechanism", mechanism);
        }
        if let Some(ref username) = self.sasl_username {
            config.set("sasl.username", username);
        }
        if let Some(ref password) = self.sasl_password {
            config.set("sasl.password", password);
        }

        if let Some(ref ca) = self.tls_ca_file {
            config.set("ssl.ca.location", ca.display().to_string());
        }
        if let Some(ref cert) = self.tls_cert_file {
            config.set("ssl.certificate.location", cert.display().to_string());
        }
        if let Some(ref key) = self.tls_key_file {
            config.set("ssl.key.location", key.display().to_string());
        }

        config.set("message.timeout.ms", self.message_timeout_ms.to_string());
        config.set(
            "request.timeout.ms",
            self.request_timeout.as_millis().to_string(),
        );

        // Custom producer configuration overrides built-in options
        for (key, value) in &self.producer_config {
            config.set(key, value);
        }

        config
    }
}
