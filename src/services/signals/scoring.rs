//! Composite scoring: simple weighted, correlation-adjusted and Mahalanobis.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SignalError;
use crate::types::{
    CompositeMethod, CompositeScore, ConsensusResult, CorrelationMatrix, CovarianceSource,
    IndicatorKind, IndividualSignal, MahalanobisDistances, MethodResults, Recommendation,
    SignClass, SignalVector,
};

const N: usize = IndicatorKind::COUNT;
type Matrix = [[f64; N]; N];

/// Fixed base weights: RSI 0.25, MACD 0.25, Bollinger 0.20, EMA 0.15, Volume 0.15.
pub const BASE_WEIGHTS: [f64; N] = [0.25, 0.25, 0.20, 0.15, 0.15];

/// Fraction of an indicator's weight removed at average |r| = 1.
pub const CORRELATION_DAMPING: f64 = 0.5;

/// Diagonal jitter added to the historical covariance.
const COVARIANCE_RIDGE: f64 = 1e-6;

/// Pivots below this make the covariance singular.
const SINGULAR_PIVOT: f64 = 1e-12;

/// Canonical signal patterns the Mahalanobis method measures against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prototypes {
    pub neutral: SignalVector,
    pub bullish: SignalVector,
    pub bearish: SignalVector,
}

impl Default for Prototypes {
    fn default() -> Self {
        let bullish = [0.6, 0.5, 0.6, 0.4, 0.4];
        Self {
            neutral: SignalVector::default(),
            bullish: SignalVector::new(bullish),
            bearish: SignalVector::new(bullish.map(|v| -v)),
        }
    }
}

/// Weighted sum of `signals`.
pub fn weighted_sum(weights: &[f64; N], signals: &SignalVector) -> f64 {
    weights
        .iter()
        .zip(signals.as_slice())
        .map(|(w, s)| w * s)
        .sum()
}

/// Scale `weights` to sum to 1. All-zero input falls back to the base weights.
pub fn normalize_weights(weights: [f64; N]) -> [f64; N] {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return BASE_WEIGHTS;
    }
    weights.map(|w| w / total)
}

/// Down-weight indicators that duplicate their peers, then renormalize.
///
/// Without a correlation matrix the base weights are returned unchanged.
pub fn correlation_weights(matrix: Option<&CorrelationMatrix>) -> [f64; N] {
    let Some(matrix) = matrix else {
        return normalize_weights(BASE_WEIGHTS);
    };

    let mut adjusted = BASE_WEIGHTS;
    for kind in IndicatorKind::ALL {
        let avg = matrix.average_abs_correlation(kind);
        let avg = if avg.is_finite() { avg.clamp(0.0, 1.0) } else { 0.0 };
        adjusted[kind.index()] *= 1.0 - CORRELATION_DAMPING * avg;
    }
    normalize_weights(adjusted)
}

fn difference(a: &SignalVector, b: &SignalVector) -> [f64; N] {
    let mut d = [0.0; N];
    for (i, slot) in d.iter_mut().enumerate() {
        *slot = a.0[i] - b.0[i];
    }
    d
}

fn identity() -> Matrix {
    let mut m = [[0.0; N]; N];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

/// Sample covariance of `vectors` (needs at least two).
fn covariance(vectors: &[SignalVector]) -> Matrix {
    let n = vectors.len() as f64;
    let mut mean = [0.0; N];
    for v in vectors {
        for (i, m) in mean.iter_mut().enumerate() {
            *m += v.0[i] / n;
        }
    }

    let mut cov = [[0.0; N]; N];
    for v in vectors {
        for i in 0..N {
            for j in 0..N {
                cov[i][j] += (v.0[i] - mean[i]) * (v.0[j] - mean[j]);
            }
        }
    }
    for row in cov.iter_mut() {
        for c in row.iter_mut() {
            *c /= n - 1.0;
        }
    }
    cov
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(matrix: &Matrix) -> Option<Matrix> {
    let mut a = *matrix;
    let mut inv = identity();

    for col in 0..N {
        let pivot_row = (col..N).max_by(|x, y| {
            a[*x][col]
                .abs()
                .partial_cmp(&a[*y][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        let pivot = a[pivot_row][col];
        if pivot.abs() < SINGULAR_PIVOT || !pivot.is_finite() {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        for j in 0..N {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Some(inv)
}

/// Inverse covariance fitted on historical signal vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct MahalanobisModel {
    inverse_covariance: Matrix,
    source: CovarianceSource,
    prototypes: Prototypes,
}

impl MahalanobisModel {
    /// Fit on `history`; falls back to the identity (Euclidean distance) when
    /// there are fewer than `min_history` vectors or the covariance is singular.
    pub fn fit(history: &[SignalVector], min_history: usize, prototypes: Prototypes) -> Self {
        let required = min_history.max(N + 1);
        if history.len() < required {
            debug!(
                "Mahalanobis using identity covariance: {} of {} history vectors",
                history.len(),
                required
            );
            return Self::identity(prototypes);
        }

        let mut cov = covariance(history);
        for (i, row) in cov.iter_mut().enumerate() {
            row[i] += COVARIANCE_RIDGE;
        }

        match invert(&cov) {
            Some(inverse_covariance) => Self {
                inverse_covariance,
                source: CovarianceSource::Historical,
                prototypes,
            },
            None => {
                debug!("Covariance matrix singular, using identity");
                Self::identity(prototypes)
            }
        }
    }

    pub fn identity(prototypes: Prototypes) -> Self {
        Self {
            inverse_covariance: identity(),
            source: CovarianceSource::Identity,
            prototypes,
        }
    }

    pub fn source(&self) -> CovarianceSource {
        self.source
    }

    /// Mahalanobis distance between two vectors.
    pub fn distance(&self, a: &SignalVector, b: &SignalVector) -> f64 {
        let d = difference(a, b);
        let mut total = 0.0;
        for i in 0..N {
            for j in 0..N {
                total += d[i] * self.inverse_covariance[i][j] * d[j];
            }
        }
        // A ridge-regularised inverse stays positive definite; guard rounding.
        total.max(0.0).sqrt()
    }

    pub fn distances(&self, signals: &SignalVector) -> MahalanobisDistances {
        MahalanobisDistances {
            neutral: self.distance(signals, &self.prototypes.neutral),
            bullish: self.distance(signals, &self.prototypes.bullish),
            bearish: self.distance(signals, &self.prototypes.bearish),
            covariance: self.source,
        }
    }

    /// Closer to bullish is positive, closer to bearish negative, scaled by
    /// the largest prototype distance.
    pub fn score(&self, signals: &SignalVector) -> (CompositeScore, MahalanobisDistances) {
        let distances = self.distances(signals);
        let max_distance = distances
            .neutral
            .max(distances.bullish)
            .max(distances.bearish);
        let raw = ((distances.bearish - distances.bullish) / (max_distance + 1e-6)).tanh();
        let raw = if raw.is_finite() { raw } else { 0.0 };

        (CompositeScore::new(CompositeMethod::Mahalanobis, raw), distances)
    }
}

/// Average the method scores; disagree only when buy and sell families both occur.
pub fn consensus(scores: &[CompositeScore]) -> ConsensusResult {
    let values: Vec<f64> = scores.iter().map(|s| s.score).collect();
    let average_score = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    };

    let classes: Vec<SignClass> = scores
        .iter()
        .map(|s| Recommendation::from_score(s.score).sign_class())
        .collect();
    let has_buy = classes.contains(&SignClass::Buy);
    let has_sell = classes.contains(&SignClass::Sell);

    ConsensusResult {
        scores: values,
        average_score,
        recommendation: Recommendation::from_score(average_score),
        agreement: !(has_buy && has_sell),
    }
}

/// Runs every composite method over one set of current signals.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    min_covariance_history: usize,
    prototypes: Prototypes,
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self::new(30)
    }
}

impl CompositeScorer {
    pub fn new(min_covariance_history: usize) -> Self {
        Self {
            min_covariance_history,
            prototypes: Prototypes::default(),
        }
    }

    pub fn simple_weighted(&self, signals: &SignalVector) -> CompositeScore {
        CompositeScore::new(
            CompositeMethod::SimpleWeighted,
            weighted_sum(&BASE_WEIGHTS, signals),
        )
    }

    pub fn correlation_adjusted(
        &self,
        signals: &SignalVector,
        matrix: Option<&CorrelationMatrix>,
    ) -> (CompositeScore, [f64; N]) {
        let weights = correlation_weights(matrix);
        (
            CompositeScore::new(
                CompositeMethod::CorrelationAdjusted,
                weighted_sum(&weights, signals),
            ),
            weights,
        )
    }

    pub fn fit_mahalanobis(&self, history: &[SignalVector]) -> MahalanobisModel {
        MahalanobisModel::fit(history, self.min_covariance_history, self.prototypes)
    }

    /// Score a vector with an already fitted model.
    pub fn score_vector(
        &self,
        signals: &SignalVector,
        matrix: Option<&CorrelationMatrix>,
        model: &MahalanobisModel,
    ) -> MethodResults {
        let simple_weighted = self.simple_weighted(signals);
        let (correlation_adjusted, weights) = self.correlation_adjusted(signals, matrix);
        let (mahalanobis, mahalanobis_distances) = model.score(signals);

        MethodResults {
            individual_signals: IndicatorKind::ALL
                .iter()
                .map(|kind| (*kind, IndividualSignal::new(signals.get(*kind))))
                .collect(),
            simple_weighted,
            correlation_adjusted,
            mahalanobis,
            correlation_weights: IndicatorKind::ALL
                .iter()
                .map(|kind| (*kind, weights[kind.index()]))
                .collect(),
            mahalanobis_distances,
        }
    }

    /// Score a keyed signal set. Every indicator must be present.
    pub fn score(
        &self,
        signals: &BTreeMap<IndicatorKind, f64>,
        matrix: Option<&CorrelationMatrix>,
        history: &[SignalVector],
    ) -> Result<(MethodResults, ConsensusResult), SignalError> {
        let vector = SignalVector::from_map(signals)?;
        let model = self.fit_mahalanobis(history);
        let methods = self.score_vector(&vector, matrix, &model);
        let consensus = consensus(&methods.scores());
        Ok((methods, consensus))
    }
}
