use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use dashmap::DashMap;

use crate::metrics_consts::SNAPSHOT_TIME;
use crate::types::NormalizedHashtag;

/// Running hashtag counts for a single pipeline run.
///
/// Cloning gives another handle on the same counts, so every ingestion worker and the
/// reporter can share one counter. Increments to different hashtags only contend
/// when they hash to the same shard of the underlying map.
///
/// Snapshots are consistent: incrementers hold the epoch gate shared, and a snapshot
/// holds it exclusively while it copies, so a snapshot sees every increment that
/// finished before it started and none that started after.
#[derive(Clone, Default)]
pub struct HashtagCounter {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    counts: DashMap<NormalizedHashtag, u64>,
    epoch: RwLock<()>,
}

impl HashtagCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, tag: &NormalizedHashtag) {
        self.increment_by(tag, 1)
    }

    pub fn increment_by(&self, tag: &NormalizedHashtag, by: u64) {
        if by == 0 {
            return;
        }

        let _epoch = self
            .inner
            .epoch
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        // Avoid cloning the key when it's already counted, which is the common case
        if let Some(mut count) = self.inner.counts.get_mut(tag.as_str()) {
            *count += by;
            return;
        }
        *self.inner.counts.entry(tag.clone()).or_insert(0) += by;
    }

    /// A point-in-time copy of the counts. Writers are blocked only while copying.
    pub fn snapshot(&self) -> Snapshot {
        let start = Instant::now();
        let _epoch = self
            .inner
            .epoch
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.copy_counts();
        metrics::histogram!(SNAPSHOT_TIME).record(start.elapsed().as_secs_f64() * 1000.0);
        snapshot
    }

    /// Like [`HashtagCounter::snapshot`], but also empties the counter, starting a new window.
    pub fn snapshot_and_reset(&self) -> Snapshot {
        let start = Instant::now();
        let _epoch = self
            .inner
            .epoch
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let snapshot = self.copy_counts();
        self.inner.counts.clear();
        metrics::histogram!(SNAPSHOT_TIME).record(start.elapsed().as_secs_f64() * 1000.0);
        snapshot
    }

    /// Number of distinct hashtags currently counted. Not synchronised with writers.
    pub fn len(&self) -> usize {
        self.inner.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.counts.is_empty()
    }

    fn copy_counts(&self) -> Snapshot {
        let counts = self
            .inner
            .counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        Snapshot { counts }
    }
}

/// Hashtag counts as they were when a snapshot was taken.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    counts: HashMap<NormalizedHashtag, u64>,
}

impl Snapshot {
    pub fn get(&self, tag: &str) -> Option<u64> {
        self.counts.get(tag).copied()
    }

    /// Number of distinct hashtags.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn into_counts(self) -> HashMap<NormalizedHashtag, u64> {
        self.counts
    }
}

impl FromIterator<(NormalizedHashtag, u64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (NormalizedHashtag, u64)>>(iter: I) -> Self {
        let mut counts = HashMap::new();
        for (tag, count) in iter {
            *counts.entry(tag).or_insert(0) += count;
        }
        Snapshot { counts }
    }
}
