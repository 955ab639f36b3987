pub mod aggregator;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod health;
#[cfg(feature = "kafka")]
pub mod kafka_source;
pub mod metrics_consts;
pub mod normalizer;
pub mod pipeline;
pub mod reporter;
pub mod serve_metrics;
pub mod sink;
pub mod source;
pub mod types;
