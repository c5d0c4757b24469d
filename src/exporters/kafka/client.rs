// SPDX-License-Identifier: Apache-2.0

use crate::exporters::kafka::config::KafkaExporterConfig;
use crate::exporters::kafka::errors::{KafkaExportError, Result, SendError};
use crate::exporters::kafka::message::KafkaMessage;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends finished messages to the brokers.
pub trait BrokerClient: Send + Sync {
    /// Resolves once the message is acknowledged according to the producer's acks setting.
    fn send(
        &self,
        topic: &str,
        message: &KafkaMessage,
    ) -> impl Future<Output = std::result::Result<(), SendError>> + Send;

    /// Flushes anything still buffered.
    fn close(&self) -> std::result::Result<(), SendError>;
}

/// Broker client backed by librdkafka
#[derive(Clone)]
pub struct RdKafkaClient {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl RdKafkaClient {
    pub fn new(config: &KafkaExporterConfig) -> Result<Self> {
        let producer: FutureProducer = config.build_client_config().create().map_err(|e| {
            KafkaExportError::ConfigurationError(format!("Failed to create producer: {}", e))
        })?;
        Ok(Self {
            producer,
            send_timeout: config.request_timeout,
        })
    }
}

impl BrokerClient for RdKafkaClient {
    async fn send(
        &self,
        topic: &str,
        message: &KafkaMessage,
    ) -> std::result::Result<(), SendError> {
        let mut record = FutureRecord::<str, [u8]>::to(topic).payload(message.payload.as_ref());
        if let Some(key) = message.key.as_deref() {
            record = record.key(key);
        }

        let delivery = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await?;
        debug!(
            "Message sent to partition {} at offset {}",
            delivery.partition, delivery.offset
        );
        Ok(())
    }

    fn close(&self) -> std::result::Result<(), SendError> {
        self.producer.flush(Timeout::After(FLUSH_TIMEOUT))?;
        Ok(())
    }
}
