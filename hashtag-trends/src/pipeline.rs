use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregator::HashtagCounter;
use crate::cli::Args;
use crate::config::Config;
use crate::decoder::decode;
use crate::error::{PipelineError, SourceError};
use crate::extractor::{extract, AuthorPosition};
use crate::health::{HealthHandle, HealthRegistry};
use crate::metrics_consts::{
    DECODE_ERRORS, EMPTY_EVENTS, EVENTS_RECEIVED, HASHTAGS_COUNTED, SOURCE_ERRORS,
    WORKERS_ABORTED,
};
use crate::normalizer::normalize_all;
use crate::reporter::{Report, ReportMode, Reporter, WindowMode};
use crate::sink::ReportSink;
use crate::source::EventSource;

// Workers report liveness on this schedule even while the source is quiet
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);
const LIVENESS_DEADLINE: Duration = Duration::from_secs(30);
const SOURCE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Total run duration. Ingestion stops when it elapses.
    pub run_for: Duration,
    pub report_interval: Duration,
    /// Upper bound on the time in-flight events get to finish after the run ends.
    pub drain_grace: Duration,
    pub n_top: usize,
    pub worker_count: usize,
    pub report_mode: ReportMode,
    pub window_mode: WindowMode,
    pub author_position: AuthorPosition,
}

impl PipelineSettings {
    pub fn new(run_for: Duration, report_interval: Duration, n_top: usize) -> Self {
        Self {
            run_for,
            report_interval,
            drain_grace: Duration::from_secs(5),
            n_top,
            worker_count: 2,
            report_mode: ReportMode::default(),
            window_mode: WindowMode::default(),
            author_position: AuthorPosition::default(),
        }
    }

    pub fn from_args(args: &Args, config: &Config) -> Self {
        Self {
            run_for: args.run_for(),
            report_interval: config.report_interval_ms.0,
            drain_grace: config.drain_grace_ms.0,
            n_top: args.n_top(),
            worker_count: config.worker_count,
            report_mode: config.report_mode,
            window_mode: config.window_mode,
            author_position: config.author_position,
        }
    }
}

/// What a finished run did.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub events_received: u64,
    /// Events that contributed at least one hashtag.
    pub events_counted: u64,
    pub hashtags_counted: u64,
    pub reports_emitted: u64,
    /// Workers still busy when the drain grace period ran out.
    pub workers_aborted: usize,
    pub final_report: Option<Report>,
}

impl RunSummary {
    fn absorb(&mut self, worker: Result<WorkerStats, JoinError>) {
        match worker {
            Ok(stats) => {
                self.events_received += stats.events_received;
                self.events_counted += stats.events_counted;
                self.hashtags_counted += stats.hashtags_counted;
            }
            Err(e) => error!("ingestion worker failed: {}", e),
        }
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    events_received: u64,
    events_counted: u64,
    hashtags_counted: u64,
}

/// Decode, extract, normalize and count a single payload. Returns the number of
/// hashtags counted; a payload that carries no signal counts nothing.
pub fn ingest(raw: &[u8], counter: &HashtagCounter, author_position: AuthorPosition) -> usize {
    metrics::counter!(EVENTS_RECEIVED).increment(1);

    let event = match decode(raw) {
        Ok(event) => event,
        Err(e) => {
            metrics::counter!(DECODE_ERRORS, "kind" => e.kind()).increment(1);
            debug!("failed to decode event: {}", e);
            return 0;
        }
    };

    let Some(extraction) = extract(&event, author_position) else {
        metrics::counter!(EMPTY_EVENTS).increment(1);
        return 0;
    };

    let hashtags = normalize_all(&extraction);
    for tag in &hashtags {
        counter.increment(tag);
    }
    metrics::counter!(HASHTAGS_COUNTED).increment(hashtags.len() as u64);
    hashtags.len()
}

async fn ingestion_loop(
    worker: usize,
    source: Arc<dyn EventSource>,
    counter: HashtagCounter,
    author_position: AuthorPosition,
    shutdown: CancellationToken,
    liveness: HealthHandle,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        // Shutdown wins over anything the source has ready, so nothing is picked up
        // once the run is over.
        let received = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = heartbeat.tick() => {
                liveness.report_healthy();
                continue;
            }
            received = source.recv() => received,
        };

        match received {
            Ok(raw) => {
                stats.events_received += 1;
                let counted = ingest(&raw, &counter, author_position);
                if counted > 0 {
                    stats.events_counted += 1;
                    stats.hashtags_counted += counted as u64;
                }
            }
            Err(SourceError::Closed) => {
                info!("source closed, stopping ingestion worker {}", worker);
                break;
            }
            Err(e) => {
                warn!("ingestion worker {} failed to receive: {}", worker, e);
                metrics::counter!(SOURCE_ERRORS).increment(1);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(SOURCE_ERROR_BACKOFF) => {}
                }
            }
        }
    }

    stats
}

/// Wires the source, the ingestion workers, the counter and the reporter together for
/// one run. Every run owns its own counter.
pub struct Pipeline {
    settings: PipelineSettings,
    counter: HashtagCounter,
    liveness: Option<HealthRegistry>,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            settings,
            counter: HashtagCounter::new(),
            liveness: None,
        }
    }

    /// Register the workers and the reporter with this registry instead of a private one.
    pub fn with_liveness(mut self, liveness: HealthRegistry) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// A handle on the counts of this run.
    pub fn counter(&self) -> HashtagCounter {
        self.counter.clone()
    }

    /// Consume `source` until the run duration elapses or the source closes, reporting
    /// to `sink` on every tick. In-flight events get up to the drain grace period to
    /// finish, then one final report is emitted.
    pub async fn run(
        self,
        source: Arc<dyn EventSource>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<RunSummary, PipelineError> {
        let settings = self.settings;
        if settings.worker_count == 0 {
            return Err(PipelineError::NoWorkers);
        }
        if settings.report_interval.is_zero() {
            return Err(PipelineError::ZeroReportInterval);
        }

        let liveness = self
            .liveness
            .unwrap_or_else(|| HealthRegistry::new("liveness"));
        let shutdown = CancellationToken::new();
        let reporter = Arc::new(Reporter::new(
            self.counter.clone(),
            sink,
            settings.n_top,
            settings.report_mode,
            settings.window_mode,
        ));

        info!(
            run_for = ?settings.run_for,
            report_interval = ?settings.report_interval,
            workers = settings.worker_count,
            n_top = settings.n_top,
            "starting pipeline"
        );

        let reporter_task = {
            let reporter = reporter.clone();
            let shutdown = shutdown.clone();
            let handle = liveness.register("reporter", LIVENESS_DEADLINE);
            let interval = settings.report_interval;
            tokio::spawn(async move { reporter.run(interval, shutdown, handle).await })
        };

        let mut workers = JoinSet::new();
        for worker in 0..settings.worker_count {
            let handle = liveness.register(format!("worker_{worker}"), LIVENESS_DEADLINE);
            workers.spawn(ingestion_loop(
                worker,
                source.clone(),
                self.counter.clone(),
                settings.author_position,
                shutdown.clone(),
                handle,
            ));
        }

        let mut summary = RunSummary::default();
        let deadline = tokio::time::sleep(settings.run_for);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    info!("run duration reached, stopping ingestion");
                    break;
                }
                joined = workers.join_next() => match joined {
                    Some(worker) => summary.absorb(worker),
                    None => {
                        info!("all ingestion workers finished, ending run early");
                        break;
                    }
                }
            }
        }

        shutdown.cancel();

        let drained = tokio::time::timeout(settings.drain_grace, async {
            while let Some(worker) = workers.join_next().await {
                summary.absorb(worker);
            }
        })
        .await;
        if drained.is_err() {
            summary.workers_aborted = workers.len();
            warn!(
                "{} ingestion workers did not drain in {:?}, aborting them",
                summary.workers_aborted, settings.drain_grace
            );
            metrics::counter!(WORKERS_ABORTED).increment(summary.workers_aborted as u64);
            workers.shutdown().await;
        }

        summary.reports_emitted = match reporter_task.await {
            Ok(emitted) => emitted,
            Err(e) => {
                error!("reporter failed: {}", e);
                0
            }
        };

        let final_report = reporter.emit(true).await?;
        summary.reports_emitted += 1;
        summary.final_report = Some(final_report);

        info!(
            events_received = summary.events_received,
            events_counted = summary.events_counted,
            hashtags_counted = summary.hashtags_counted,
            reports_emitted = summary.reports_emitted,
            "pipeline finished"
        );
        Ok(summary)
    }
}
