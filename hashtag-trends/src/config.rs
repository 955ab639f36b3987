use std::str::FromStr;
use std::time;

use envconfig::Envconfig;

use crate::extractor::AuthorPosition;
use crate::reporter::{ReportMode, WindowMode};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3301")]
    pub port: u16,

    // The metrics and liveness server is only started when asked for
    #[envconfig(default = "false")]
    pub export_metrics: bool,

    #[envconfig(default = "2")]
    pub worker_count: usize,

    #[envconfig(default = "1000")]
    pub report_interval_ms: EnvMsDuration,

    // How long in-flight events get to finish once the run is over
    #[envconfig(default = "5000")]
    pub drain_grace_ms: EnvMsDuration,

    #[envconfig(default = "top_n")]
    pub report_mode: ReportMode,

    #[envconfig(default = "cumulative")]
    pub window_mode: WindowMode,

    #[envconfig(default = "last")]
    pub author_position: AuthorPosition,

    #[envconfig(default = "stdin")]
    pub source: SourceKind,

    // Longer stdin lines are skipped, so one runaway line can't exhaust memory
    #[envconfig(default = "1048576")]
    pub max_payload_bytes: usize,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "twitter-stream")]
    pub kafka_topic: String,

    #[envconfig(default = "spark-streaming-consumer")]
    pub kafka_consumer_group: String,

    // Trends are about what's happening now, so skip the backlog by default
    #[envconfig(default = "latest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest

    #[envconfig(default = "false")]
    pub kafka_tls: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Stdin,
    Kafka,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdin" => Ok(SourceKind::Stdin),
            "kafka" => Ok(SourceKind::Kafka),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}
