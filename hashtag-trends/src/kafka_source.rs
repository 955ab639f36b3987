use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::{ClientConfig, Message};
use tracing::info;

use crate::config::KafkaConfig;
use crate::error::SourceError;
use crate::source::{EventSource, RawEvent};

impl From<&KafkaConfig> for ClientConfig {
    fn from(config: &KafkaConfig) -> Self {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.kafka_hosts)
            .set("statistics.interval.ms", "10000")
            .set("group.id", &config.kafka_consumer_group)
            .set("auto.offset.reset", &config.kafka_consumer_offset_reset);

        if config.kafka_tls {
            client_config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        };
        client_config
    }
}

/// Payloads read from a single Kafka topic.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    pub fn new(config: &KafkaConfig) -> Result<Self, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::from(config).create()?;
        consumer.subscribe(&[config.kafka_topic.as_str()])?;
        info!(
            "subscribed to topic {} as {}",
            config.kafka_topic, config.kafka_consumer_group
        );

        Ok(Self { consumer })
    }
}

#[async_trait]
impl EventSource for KafkaSource {
    async fn recv(&self) -> Result<RawEvent, SourceError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        // A missing payload decodes as an empty event
        Ok(message.payload().map(<[u8]>::to_vec).unwrap_or_default())
    }
}
