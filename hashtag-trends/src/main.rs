use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use envconfig::Envconfig;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use hashtag_trends::{
    cli::Args,
    config::{Config, SourceKind},
    health::HealthRegistry,
    pipeline::{Pipeline, PipelineSettings},
    serve_metrics::{setup_metrics_recorder, start_metrics_server},
    sink::{ReportSink, StdoutSink},
    source::{stdin_source, EventSource},
};

// stdout carries the report values, everything else goes to stderr
fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );
    tracing_subscriber::registry().with(log_layer).init();
}

fn build_source(config: &Config) -> anyhow::Result<Arc<dyn EventSource>> {
    match config.source {
        SourceKind::Stdin => {
            let source =
                stdin_source(config.max_payload_bytes).context("failed to start reading stdin")?;
            Ok(Arc::new(source))
        }
        #[cfg(feature = "kafka")]
        SourceKind::Kafka => {
            let source = hashtag_trends::kafka_source::KafkaSource::new(&config.kafka)
                .context("failed to create kafka consumer")?;
            Ok(Arc::new(source))
        }
        #[cfg(not(feature = "kafka"))]
        SourceKind::Kafka => {
            anyhow::bail!("SOURCE=kafka requires a build with the kafka feature enabled")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Usage errors exit here, before anything else is set up
    let args = Args::parse();

    setup_tracing();
    info!("starting hashtag-trends");

    let config = Config::init_from_env().context("invalid configuration")?;

    let liveness = HealthRegistry::new("liveness");
    if config.export_metrics {
        let recorder = setup_metrics_recorder().context("failed to install metrics recorder")?;
        // Detached: the server lives as long as the runtime
        drop(start_metrics_server(config.bind(), liveness.clone(), recorder));
        info!("serving metrics and liveness on {}", config.bind());
    }

    let source = build_source(&config)?;
    let sink: Arc<dyn ReportSink> = Arc::new(StdoutSink {});

    let summary = Pipeline::new(PipelineSettings::from_args(&args, &config))
        .with_liveness(liveness)
        .run(source, sink)
        .await?;

    info!(
        final_value = summary.final_report.map(|report| report.value),
        "done"
    );
    Ok(())
}
