//! Per-asset bounded history of evaluation snapshots.

use crate::types::HistorySnapshot;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Ordered snapshots for one asset, oldest first, one per cadence bucket.
#[derive(Debug, Default)]
struct AssetHistory {
    snapshots: VecDeque<HistorySnapshot>,
}

impl AssetHistory {
    /// Insert in timestamp order; an existing bucket is overwritten.
    fn insert(&mut self, snapshot: HistorySnapshot) {
        let search = self
            .snapshots
            .binary_search_by_key(&snapshot.timestamp, |s| s.timestamp);

        match search {
            Ok(idx) => self.snapshots[idx] = snapshot,
            Err(idx) => self.snapshots.insert(idx, snapshot),
        }
    }

    /// Drop snapshots older than `retention_ms` before the newest one, then cap the length.
    fn evict(&mut self, retention_ms: i64, max_snapshots: usize) -> usize {
        let before = self.snapshots.len();
        if let Some(newest) = self.snapshots.back().map(|s| s.timestamp) {
            let cutoff = newest.saturating_sub(retention_ms);
            while self
                .snapshots
                .front()
                .is_some_and(|s| s.timestamp < cutoff)
            {
                self.snapshots.pop_front();
            }
        }
        while self.snapshots.len() > max_snapshots {
            self.snapshots.pop_front();
        }
        before - self.snapshots.len()
    }

    fn window(&self, window_ms: Option<i64>) -> Vec<HistorySnapshot> {
        let Some(newest) = self.snapshots.back().map(|s| s.timestamp) else {
            return Vec::new();
        };

        match window_ms {
            Some(window_ms) => {
                let start = newest.saturating_sub(window_ms);
                self.snapshots
                    .iter()
                    .filter(|s| s.timestamp >= start)
                    .cloned()
                    .collect()
            }
            None => self.snapshots.iter().cloned().collect(),
        }
    }
}

/// Keyed store of per-asset histories.
///
/// Appends for one asset hold that asset's shard lock for the whole
/// insert and eviction; readers clone under the read lock.
pub struct HistoryStore {
    data: DashMap<String, AssetHistory>,
    retention_ms: i64,
    cadence_ms: i64,
    max_snapshots: usize,
}

impl HistoryStore {
    /// Create a store keeping `retention` of history in `cadence`-sized buckets.
    pub fn new(retention: Duration, cadence: Duration) -> Arc<Self> {
        let retention_ms = retention.as_millis().min(i64::MAX as u128) as i64;
        let cadence_ms = (cadence.as_millis().min(i64::MAX as u128) as i64).max(1);
        let max_snapshots = (retention_ms / cadence_ms) as usize + 1;

        Arc::new(Self {
            data: DashMap::new(),
            retention_ms,
            cadence_ms,
            max_snapshots,
        })
    }

    /// Start of the cadence bucket containing `timestamp` (ms).
    pub fn bucket(&self, timestamp: i64) -> i64 {
        timestamp
            .div_euclid(self.cadence_ms)
            .saturating_mul(self.cadence_ms)
    }

    /// Record a snapshot for `asset`, floored to its cadence bucket.
    ///
    /// Returns the bucket timestamp it was stored under.
    pub fn append(&self, asset: &str, snapshot: HistorySnapshot) -> i64 {
        let asset_lower = asset.to_lowercase();
        let bucket = self.bucket(snapshot.timestamp);
        let snapshot = if bucket == snapshot.timestamp {
            snapshot
        } else {
            snapshot.with_timestamp(bucket)
        };

        let mut entry = self.data.entry(asset_lower).or_default();
        let history = entry.value_mut();
        history.insert(snapshot);
        let evicted = history.evict(self.retention_ms, self.max_snapshots);

        if evicted > 0 {
            debug!("Evicted {} snapshots for {}", evicted, asset);
        }

        bucket
    }

    /// Snapshots for `asset`, oldest first.
    ///
    /// `window` is measured back from the newest snapshot; `None` returns everything retained.
    pub fn history(&self, asset: &str, window: Option<Duration>) -> Vec<HistorySnapshot> {
        let asset_lower = asset.to_lowercase();
        let entry = match self.data.get(&asset_lower) {
            Some(e) => e,
            None => return Vec::new(),
        };

        let window_ms = window.map(|w| w.as_millis().min(i64::MAX as u128) as i64);
        entry.window(window_ms)
    }

    /// The last `n` snapshots for `asset`, oldest first.
    pub fn latest(&self, asset: &str, n: usize) -> Vec<HistorySnapshot> {
        let asset_lower = asset.to_lowercase();
        let entry = match self.data.get(&asset_lower) {
            Some(e) => e,
            None => return Vec::new(),
        };

        let skip = entry.snapshots.len().saturating_sub(n);
        entry.snapshots.iter().skip(skip).cloned().collect()
    }

    /// Number of snapshots held for `asset`.
    pub fn len(&self, asset: &str) -> usize {
        self.data
            .get(&asset.to_lowercase())
            .map(|e| e.snapshots.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, asset: &str) -> bool {
        self.len(asset) == 0
    }

    /// Assets with at least one snapshot.
    pub fn assets(&self) -> Vec<String> {
        let mut assets: Vec<String> = self
            .data
            .iter()
            .filter(|e| !e.snapshots.is_empty())
            .map(|e| e.key().clone())
            .collect();
        assets.sort();
        assets
    }
}
