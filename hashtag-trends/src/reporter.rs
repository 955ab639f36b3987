use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::aggregator::{HashtagCounter, Snapshot};
use crate::error::SinkError;
use crate::health::HealthHandle;
use crate::metrics_consts::{DISTINCT_HASHTAGS, REPORTED_HASHTAGS, REPORTS_EMITTED, REPORT_FAILED};
use crate::sink::ReportSink;
use crate::types::NormalizedHashtag;

/// Which number a report hands to the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportMode {
    /// The number of ranked entries after truncating to the top N.
    #[default]
    TopN,
    /// The number of distinct hashtags in the window, ignoring N.
    Distinct,
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top_n" => Ok(ReportMode::TopN),
            "distinct" => Ok(ReportMode::Distinct),
            _ => Err(format!("unknown report mode: {s}")),
        }
    }
}

/// Whether counts accumulate for the whole run or start over on every tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WindowMode {
    #[default]
    Cumulative,
    Tumbling,
}

impl FromStr for WindowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cumulative" => Ok(WindowMode::Cumulative),
            "tumbling" => Ok(WindowMode::Tumbling),
            _ => Err(format!("unknown window mode: {s}")),
        }
    }
}

/// Hashtags ordered by count descending, ties broken by hashtag ascending, keeping at
/// most `n_top` entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankedReport {
    entries: Vec<(NormalizedHashtag, u64)>,
    distinct_hashtags: usize,
}

fn by_rank(a: &(NormalizedHashtag, u64), b: &(NormalizedHashtag, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))
}

impl RankedReport {
    pub fn rank(snapshot: Snapshot, n_top: usize) -> Self {
        let distinct_hashtags = snapshot.len();
        let mut entries: Vec<_> = snapshot.into_counts().into_iter().collect();

        // Partition first so we only fully sort what we keep
        if n_top < entries.len() {
            if n_top > 0 {
                entries.select_nth_unstable_by(n_top - 1, by_rank);
            }
            entries.truncate(n_top);
        }
        entries.sort_unstable_by(by_rank);

        RankedReport {
            entries,
            distinct_hashtags,
        }
    }

    pub fn entries(&self) -> &[(NormalizedHashtag, u64)] {
        &self.entries
    }

    /// Number of ranked entries, at most the `n_top` the report was ranked with.
    pub fn cardinality(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct hashtags in the snapshot the report was ranked from.
    pub fn distinct_hashtags(&self) -> usize {
        self.distinct_hashtags
    }

    pub fn first(&self) -> Option<(&str, u64)> {
        self.entries
            .first()
            .map(|(tag, count)| (tag.as_str(), *count))
    }

    pub fn value(&self, mode: ReportMode) -> usize {
        match mode {
            ReportMode::TopN => self.cardinality(),
            ReportMode::Distinct => self.distinct_hashtags(),
        }
    }
}

/// What gets handed to the sink once per tick.
#[derive(Clone, Debug)]
pub struct Report {
    pub value: usize,
    pub ranked: RankedReport,
    pub generated_at: OffsetDateTime,
    /// True for the report emitted after the pipeline drained.
    pub is_final: bool,
}

pub struct Reporter {
    counter: HashtagCounter,
    sink: Arc<dyn ReportSink>,
    n_top: usize,
    report_mode: ReportMode,
    window_mode: WindowMode,
}

impl Reporter {
    pub fn new(
        counter: HashtagCounter,
        sink: Arc<dyn ReportSink>,
        n_top: usize,
        report_mode: ReportMode,
        window_mode: WindowMode,
    ) -> Self {
        Self {
            counter,
            sink,
            n_top,
            report_mode,
            window_mode,
        }
    }

    fn take_snapshot(&self) -> Snapshot {
        match self.window_mode {
            WindowMode::Cumulative => self.counter.snapshot(),
            WindowMode::Tumbling => self.counter.snapshot_and_reset(),
        }
    }

    /// Snapshot, rank and hand one report to the sink. Ranking happens on the copy,
    /// after the counter has been released.
    pub async fn emit(&self, is_final: bool) -> Result<Report, SinkError> {
        let ranked = RankedReport::rank(self.take_snapshot(), self.n_top);
        let report = Report {
            value: ranked.value(self.report_mode),
            ranked,
            generated_at: OffsetDateTime::now_utc(),
            is_final,
        };

        metrics::gauge!(DISTINCT_HASHTAGS).set(report.ranked.distinct_hashtags() as f64);
        metrics::gauge!(REPORTED_HASHTAGS).set(report.value as f64);

        info!(
            value = report.value,
            distinct = report.ranked.distinct_hashtags(),
            leader = ?report.ranked.first(),
            is_final,
            "report"
        );

        self.sink.emit(&report).await?;
        metrics::counter!(REPORTS_EMITTED).increment(1);
        Ok(report)
    }

    /// Emit a report on every tick until `shutdown` fires. Ticks are independent of
    /// event arrival: a quiet tick still reports whatever the counter holds. Returns
    /// the number of reports emitted.
    pub async fn run(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
        liveness: HealthHandle,
    ) -> u64 {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut emitted = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    liveness.report_healthy();
                    match self.emit(false).await {
                        Ok(_) => emitted += 1,
                        Err(e) => {
                            error!("failed to emit report: {}", e);
                            metrics::counter!(REPORT_FAILED).increment(1);
                        }
                    }
                }
            }
        }

        emitted
    }
}
