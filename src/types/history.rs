use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::signals::{CompositeMethod, IndicatorKind, SignalVector};

/// One evaluation cycle recorded for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    /// Unix timestamp in milliseconds (bucket start).
    pub timestamp: i64,
    /// Same instant, for charts.
    pub time: DateTime<Utc>,
    /// Continuous signal per indicator.
    pub indicators: BTreeMap<IndicatorKind, f64>,
    /// Score per composite method.
    pub methods: BTreeMap<CompositeMethod, f64>,
}

impl HistorySnapshot {
    pub fn new(
        timestamp: i64,
        signals: &SignalVector,
        methods: BTreeMap<CompositeMethod, f64>,
    ) -> Self {
        Self {
            timestamp,
            time: Utc
                .timestamp_millis_opt(timestamp)
                .single()
                .unwrap_or_default(),
            indicators: signals.to_map(),
            methods,
        }
    }

    /// Move the snapshot onto a new timestamp (used when bucketing).
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self.time = Utc
            .timestamp_millis_opt(timestamp)
            .single()
            .unwrap_or_default();
        self
    }

    /// Stored signals as a vector, if every indicator is present.
    pub fn signal_vector(&self) -> Option<SignalVector> {
        SignalVector::from_map(&self.indicators).ok()
    }
}
