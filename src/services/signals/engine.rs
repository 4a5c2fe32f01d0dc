//! Signal engine: runs the indicator library over a series, scores it with
//! every composite method and records the outcome in the asset's history.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::correlation::{correlation_matrix, matrix_from_vectors, strong_correlations};
use super::indicators::{all_indicators, max_min_periods};
use super::scoring::{consensus, CompositeScorer};
use super::Indicator;
use crate::config::EngineConfig;
use crate::error::SignalError;
use crate::services::HistoryStore;
use crate::types::{
    validate_series, CorrelationMatrix, EvaluationResult, HistorySnapshot, IndicatorKind,
    IndicatorResult, PricePoint, SignalVector,
};

/// Evaluates price series and maintains per-asset signal history.
pub struct SignalEngine {
    config: EngineConfig,
    history: Arc<HistoryStore>,
    indicators: Vec<Box<dyn Indicator>>,
    scorer: CompositeScorer,
}

impl SignalEngine {
    /// Create an engine writing into `history`.
    pub fn new(config: EngineConfig, history: Arc<HistoryStore>) -> Arc<Self> {
        let scorer = CompositeScorer::new(config.covariance_min_history);
        Arc::new(Self {
            config,
            history,
            indicators: all_indicators(),
            scorer,
        })
    }

    /// Engine with its own history store sized from `config`.
    pub fn from_config(config: EngineConfig) -> Arc<Self> {
        let history = HistoryStore::new(config.history_retention, config.history_cadence);
        Self::new(config, history)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history_store(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Points needed before every indicator can run.
    pub fn min_points(&self) -> usize {
        max_min_periods(&self.indicators)
    }

    /// Run every indicator over a validated series.
    ///
    /// Any indicator failure fails the whole set.
    pub fn compute_indicators(
        &self,
        points: &[PricePoint],
    ) -> Result<BTreeMap<IndicatorKind, IndicatorResult>, SignalError> {
        validate_series(points)?;

        let mut results = BTreeMap::new();
        for indicator in &self.indicators {
            let result = indicator.calculate(points)?;
            results.insert(result.kind, result);
        }
        Ok(results)
    }

    fn signal_vector(
        indicators: &BTreeMap<IndicatorKind, IndicatorResult>,
    ) -> Result<SignalVector, SignalError> {
        let signals: BTreeMap<IndicatorKind, f64> = indicators
            .iter()
            .map(|(kind, result)| (*kind, result.continuous_signal))
            .collect();
        SignalVector::from_map(&signals)
    }

    /// Signal vectors from the asset's rolling correlation window, oldest first.
    fn window_vectors(&self, asset: &str) -> Vec<SignalVector> {
        self.history
            .latest(asset, self.config.correlation_window)
            .iter()
            .filter_map(|s| s.signal_vector())
            .collect()
    }

    /// Evaluate `points` for `asset`.
    ///
    /// The correlation matrix and covariance come from history recorded before
    /// this evaluation; the evaluation itself is appended afterwards.
    pub fn evaluate(
        &self,
        asset: &str,
        points: &[PricePoint],
    ) -> Result<EvaluationResult, SignalError> {
        let asset = asset.to_lowercase();
        debug!("Evaluating {} with {} points", asset, points.len());

        let indicators = self.compute_indicators(points)?;
        let vector = Self::signal_vector(&indicators)?;

        if self.config.backfill_on_evaluate && points.len() > 1 {
            self.backfill(&asset, &points[..points.len() - 1])?;
        }

        let window = self.window_vectors(&asset);
        let matrix = match matrix_from_vectors(&window, self.config.correlation_min_history) {
            Ok(matrix) => Some(matrix),
            Err(e) => {
                debug!("Correlation matrix unavailable for {}: {}", asset, e);
                None
            }
        };

        let model = self.scorer.fit_mahalanobis(&window);
        let methods = self.scorer.score_vector(&vector, matrix.as_ref(), &model);
        let consensus = consensus(&methods.scores());

        let strong = matrix
            .as_ref()
            .map(|m| {
                strong_correlations(
                    m,
                    self.config.strong_correlation_threshold,
                    self.config.strong_correlation_limit,
                )
            })
            .unwrap_or_default();

        // Validated non-empty above.
        let last = points[points.len() - 1];
        self.history.append(
            &asset,
            HistorySnapshot::new(last.timestamp, &vector, methods.score_map()),
        );

        debug!(
            "{} scored {:.3} ({}, {})",
            asset,
            consensus.average_score,
            consensus.recommendation.label(),
            consensus.label()
        );

        Ok(EvaluationResult {
            asset,
            timestamp: last.timestamp,
            current_price: last.price,
            indicators,
            methods,
            consensus,
            correlation_matrix: matrix,
            strong_correlations: strong,
        })
    }

    /// Derive snapshots for every cadence bucket of `points` inside the retention window.
    ///
    /// Only the last point of each bucket is evaluated. Returns the number of
    /// snapshots written.
    pub fn backfill(&self, asset: &str, points: &[PricePoint]) -> Result<usize, SignalError> {
        validate_series(points)?;

        let min_points = self.min_points();
        if points.len() < min_points {
            return Ok(0);
        }

        let newest = points[points.len() - 1].timestamp;
        let retention_ms = self.config.history_retention.as_millis().min(i64::MAX as u128) as i64;
        let cutoff = newest.saturating_sub(retention_ms);

        // Index of the last point in each bucket, ascending.
        let mut ends: Vec<usize> = Vec::new();
        for idx in (min_points - 1)..points.len() {
            let ts = points[idx].timestamp;
            if ts < cutoff {
                continue;
            }
            let bucket = self.history.bucket(ts);
            match ends.last_mut() {
                Some(last) if self.history.bucket(points[*last].timestamp) == bucket => *last = idx,
                _ => ends.push(idx),
            }
        }

        let mut derived = Vec::with_capacity(ends.len());
        for end in ends {
            let prefix = &points[..=end];
            let indicators = self.compute_indicators(prefix)?;
            derived.push((points[end].timestamp, Self::signal_vector(&indicators)?));
        }

        let vectors: Vec<SignalVector> = derived.iter().map(|(_, v)| *v).collect();
        let matrix = matrix_from_vectors(&vectors, self.config.correlation_min_history).ok();
        let model = self.scorer.fit_mahalanobis(&vectors);

        for (timestamp, vector) in &derived {
            let methods = self.scorer.score_vector(vector, matrix.as_ref(), &model);
            self.history.append(
                asset,
                HistorySnapshot::new(*timestamp, vector, methods.score_map()),
            );
        }

        debug!("Backfilled {} snapshots for {}", derived.len(), asset);
        Ok(derived.len())
    }

    /// Stored snapshots for `asset`, oldest first.
    pub fn history(&self, asset: &str, window: Option<Duration>) -> Vec<HistorySnapshot> {
        self.history.history(asset, window)
    }

    /// Correlation matrix over the asset's current rolling window.
    pub fn correlation_matrix(&self, asset: &str) -> Result<CorrelationMatrix, SignalError> {
        let window = self.history.latest(asset, self.config.correlation_window);
        correlation_matrix(&window, self.config.correlation_min_history)
    }
}
