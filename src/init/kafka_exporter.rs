// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::config::{
    AcknowledgementMode, DEFAULT_ENCODING, DEFAULT_PROTOCOL_VERSION, KafkaExporterConfig,
    PartitionerType,
};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Args, Clone)]
pub struct KafkaExporterArgs {
    /// Kafka broker addresses (comma-separated)
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_BROKERS",
        default_value = "localhost:9092"
    )]
    pub kafka_exporter_brokers: String,

    /// Topic name for traces
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_TRACES_TOPIC",
        default_value = "otlp_spans"
    )]
    pub kafka_exporter_traces_topic: String,

    /// Topic name for metrics
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_METRICS_TOPIC",
        default_value = "otlp_metrics"
    )]
    pub kafka_exporter_metrics_topic: String,

    /// Topic name for logs
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_LOGS_TOPIC",
        default_value = "otlp_logs"
    )]
    pub kafka_exporter_logs_topic: String,

    /// Encoding (otlp_proto, otlp_json, jaeger_proto, jaeger_json). Jaeger encodings apply to traces only.
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_ENCODING",
        default_value = DEFAULT_ENCODING
    )]
    pub kafka_exporter_encoding: String,

    /// Kafka protocol version of the brokers, e.g. 2.0.0
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_PROTOCOL_VERSION",
        default_value = DEFAULT_PROTOCOL_VERSION
    )]
    pub kafka_exporter_protocol_version: String,

    /// Maximum size of a single message in bytes
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_MAX_MESSAGE_BYTES",
        default_value = "1000000"
    )]
    pub kafka_exporter_max_message_bytes: usize,

    /// Compression type (gzip, snappy, lz4, zstd, none)
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_COMPRESSION")]
    pub kafka_exporter_compression: Option<String>,

    /// Request timeout
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_REQUEST_TIMEOUT",
        default_value = "30s"
    )]
    pub kafka_exporter_request_timeout: humantime::Duration,

    /// Acknowledgement mode (none, one, all)
    #[arg(
        value_enum,
        long,
        env = "ROTEL_KAFKA_EXPORTER_ACKS",
        default_value = "one"
    )]
    pub kafka_exporter_acks: KafkaAcknowledgementMode,

    /// Partitioner used for keyed messages
    #[arg(
        value_enum,
        long,
        env = "ROTEL_KAFKA_EXPORTER_PARTITIONER",
        default_value = "consistent-random"
    )]
    pub kafka_exporter_partitioner: KafkaPartitionerType,

    /// Send one message per trace, keyed by trace id
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_PARTITION_TRACES_BY_ID")]
    pub kafka_exporter_partition_traces_by_id: bool,

    /// Send one message per resource, keyed by a hash of the resource attributes
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_PARTITION_METRICS_BY_RESOURCE_ATTRIBUTES")]
    pub kafka_exporter_partition_metrics_by_resource_attributes: bool,

    /// Send one message per resource, keyed by a hash of the resource attributes
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_PARTITION_LOGS_BY_RESOURCE_ATTRIBUTES")]
    pub kafka_exporter_partition_logs_by_resource_attributes: bool,

    /// SASL username for authentication
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_SASL_USERNAME")]
    pub kafka_exporter_sasl_username: Option<String>,

    /// SASL password for authentication
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_SASL_PASSWORD")]
    pub kafka_exporter_sasl_password: Option<String>,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_SASL_MECHANISM")]
    pub kafka_exporter_sasl_mechanism: Option<String>,

    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    #[arg(
        long,
        env = "ROTEL_KAFKA_EXPORTER_SECURITY_PROTOCOL",
        default_value = "PLAINTEXT"
    )]
    pub kafka_exporter_security_protocol: String,

    /// CA certificate used to verify the brokers
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_TLS_CA_FILE")]
    pub kafka_exporter_tls_ca_file: Option<PathBuf>,

    /// Client certificate
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_TLS_CERT_FILE")]
    pub kafka_exporter_tls_cert_file: Option<PathBuf>,

    /// Client private key
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_TLS_KEY_FILE")]
    pub kafka_exporter_tls_key_file: Option<PathBuf>,

    /// Additional librdkafka producer settings as key=value, may be repeated
    #[arg(long, env = "ROTEL_KAFKA_EXPORTER_PRODUCER_CONFIG", value_delimiter = ',', value_parser = parse_key_val)]
    pub kafka_exporter_producer_config: Vec<(String, String)>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum KafkaAcknowledgementMode {
    /// No acknowledgement required (acks=0) - fastest but least durable
    None,
    /// Wait for leader acknowledgement only (acks=1) - balanced
    One,
    /// Wait for all in-sync replicas (acks=all) - slowest but most durable
    All,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum KafkaPartitionerType {
    Consistent,
    ConsistentRandom,
    Murmur2Random,
    Murmur2,
    Fnv1a,
    Fnv1aRandom,
}

impl From<KafkaAcknowledgementMode> for AcknowledgementMode {
    fn from(value: KafkaAcknowledgementMode) -> Self {
        match value {
            KafkaAcknowledgementMode::None => AcknowledgementMode::None,
            KafkaAcknowledgementMode::One => AcknowledgementMode::One,
            KafkaAcknowledgementMode::All => AcknowledgementMode::All,
        }
    }
}

impl From<KafkaPartitionerType> for PartitionerType {
    fn from(value: KafkaPartitionerType) -> Self {
        match value {
            KafkaPartitionerType::Consistent => PartitionerType::Consistent,
            KafkaPartitionerType::ConsistentRandom => PartitionerType::ConsistentRandom,
            KafkaPartitionerType::Murmur2Random => PartitionerType::Murmur2Random,
            KafkaPartitionerType::Murmur2 => PartitionerType::Murmur2,
            KafkaPartitionerType::Fnv1a => PartitionerType::Fnv1a,
            KafkaPartitionerType::Fnv1aRandom => PartitionerType::Fnv1aRandom,
        }
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value pair: no `=` found in `{}`", s))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

impl KafkaExporterArgs {
    pub fn build_config(&self) -> KafkaExporterConfig {
        let mut config = KafkaExporterConfig::new(self.kafka_exporter_brokers.clone())
            .with_traces_topic(self.kafka_exporter_traces_topic.clone())
            .with_metrics_topic(self.kafka_exporter_metrics_topic.clone())
            .with_logs_topic(self.kafka_exporter_logs_topic.clone())
            .with_encoding(self.kafka_exporter_encoding.clone())
            .with_protocol_version(self.kafka_exporter_protocol_version.clone())
            .with_max_message_bytes(self.kafka_exporter_max_message_bytes)
            .with_acks(self.kafka_exporter_acks.into())
            .with_partitioner(self.kafka_exporter_partitioner.into())
            .with_request_timeout(self.kafka_exporter_request_timeout.into())
            .with_partition_traces_by_id(self.kafka_exporter_partition_traces_by_id)
            .with_partition_metrics_by_resource_attributes(
                self.kafka_exporter_partition_metrics_by_resource_attributes,
            )
            .with_partition_logs_by_resource_attributes(
                self.kafka_exporter_partition_logs_by_resource_attributes,
            )
            .with_tls(
                self.kafka_exporter_tls_ca_file.clone(),
                self.kafka_exporter_tls_cert_file.clone(),
                self.kafka_exporter_tls_key_file.clone(),
            )
            .with_custom_config(self.kafka_exporter_producer_config.clone());

        if let Some(ref compression) = self.kafka_exporter_compression {
            config = config.with_compression(compression.clone());
        }

        // Configure SASL if credentials are provided
        if let (Some(username), Some(password), Some(mechanism)) = (
            &self.kafka_exporter_sasl_username,
            &self.kafka_exporter_sasl_password,
            &self.kafka_exporter_sasl_mechanism,
        ) {
            config = config.with_sasl_auth(
                username.clone(),
                password.clone(),
                mechanism.clone(),
                self.kafka_exporter_security_protocol.clone(),
            );
        } else {
            config.security_protocol = Some(self.kafka_exporter_security_protocol.clone());
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[derive(Debug, Parser)]
    struct TestArgs {
        #[command(flatten)]
        kafka: KafkaExporterArgs,
    }

    #[test]
    fn test_defaults() {
        let args = TestArgs::try_parse_from(["test"]).unwrap();
        let config = args.kafka.build_config();

        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.traces_topic, Some("otlp_spans".to_string()));
        assert_eq!(config.encoding, "otlp_proto");
        assert_eq!(config.protocol_version, "2.0.0");
        assert_eq!(config.max_message_bytes, 1_000_000);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.acks, AcknowledgementMode::One);
        assert_eq!(config.partitioner, Some(PartitionerType::ConsistentRandom));
        assert_eq!(config.security_protocol, Some("PLAINTEXT".to_string()));
        assert!(config.sasl_username.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = TestArgs::try_parse_from([
            "test",
            "--kafka-exporter-encoding",
            "jaeger_json",
            "--kafka-exporter-max-message-bytes",
            "2048",
            "--kafka-exporter-request-timeout",
            "1m 30s",
            "--kafka-exporter-acks",
            "all",
            "--kafka-exporter-partitioner",
            "murmur2",
            "--kafka-exporter-partition-traces-by-id",
            "--kafka-exporter-producer-config",
            "enable.idempotence=true,linger.ms=20",
            "--kafka-exporter-sasl-username",
            "user",
            "--kafka-exporter-sasl-password",
            "pass",
            "--kafka-exporter-sasl-mechanism",
            "SCRAM-SHA-256",
            "--kafka-exporter-security-protocol",
            "SASL_SSL",
        ])
        .unwrap();
        let config = args.kafka.build_config();

        assert_eq!(config.encoding, "jaeger_json");
        assert_eq!(config.max_message_bytes, 2048);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.acks, AcknowledgementMode::All);
        assert_eq!(config.partitioner, Some(PartitionerType::Murmur2));
        assert!(config.partition_traces_by_id);
        assert_eq!(
            config.producer_config.get("linger.ms"),
            Some(&"20".to_string())
        );
        assert_eq!(config.sasl_mechanism, Some("SCRAM-SHA-256".to_string()));
        assert_eq!(config.security_protocol, Some("SASL_SSL".to_string()));
    }

    #[test]
    fn test_invalid_producer_config() {
        let result = TestArgs::try_parse_from([
            "test",
            "--kafka-exporter-producer-config",
            "enable.idempotence",
        ]);
        assert!(result.is_err());
    }
}
