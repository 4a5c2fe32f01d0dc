//! Pairwise correlation across indicator signal histories.

use std::cmp::Ordering;

use crate::error::SignalError;
use crate::types::{CorrelationMatrix, HistorySnapshot, IndicatorKind, SignalVector, StrongCorrelation};

/// Pearson correlation of two equally long samples.
///
/// Returns 0 when either sample has no variance or fewer than two points.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs[..n].iter().zip(&ys[..n]) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Correlation matrix over a window of signal vectors.
pub fn matrix_from_vectors(
    vectors: &[SignalVector],
    min_history: usize,
) -> Result<CorrelationMatrix, SignalError> {
    let required = min_history.max(2);
    if vectors.len() < required {
        return Err(SignalError::InsufficientHistory {
            required,
            actual: vectors.len(),
        });
    }

    let columns: Vec<Vec<f64>> = IndicatorKind::ALL
        .iter()
        .map(|kind| vectors.iter().map(|v| v.get(*kind)).collect())
        .collect();

    let mut matrix = CorrelationMatrix::identity();
    for (i, a) in IndicatorKind::ALL.iter().enumerate() {
        for (j, b) in IndicatorKind::ALL.iter().enumerate().skip(i + 1) {
            matrix.set(*a, *b, pearson(&columns[i], &columns[j]));
        }
    }

    Ok(matrix)
}

/// Correlation matrix over an asset's stored snapshots.
///
/// Snapshots missing an indicator are skipped.
pub fn correlation_matrix(
    history: &[HistorySnapshot],
    min_history: usize,
) -> Result<CorrelationMatrix, SignalError> {
    let vectors: Vec<SignalVector> = history.iter().filter_map(|s| s.signal_vector()).collect();
    matrix_from_vectors(&vectors, min_history)
}

/// Pairs with `|r| > threshold`, strongest first, at most `limit` of them.
///
/// Ties on `|r|` are ordered by indicator name.
pub fn strong_correlations(
    matrix: &CorrelationMatrix,
    threshold: f64,
    limit: usize,
) -> Vec<StrongCorrelation> {
    let mut pairs = Vec::new();
    for (i, a) in IndicatorKind::ALL.iter().enumerate() {
        for b in IndicatorKind::ALL.iter().skip(i + 1) {
            let r = matrix.get(*a, *b);
            if r.abs() > threshold {
                pairs.push(StrongCorrelation {
                    indicator1: *a,
                    indicator2: *b,
                    correlation: r,
                });
            }
        }
    }

    pairs.sort_by(|x, y| {
        y.correlation
            .abs()
            .partial_cmp(&x.correlation.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| x.indicator1.as_str().cmp(y.indicator1.as_str()))
            .then_with(|| x.indicator2.as_str().cmp(y.indicator2.as_str()))
    });
    pairs.truncate(limit);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectors(n: usize) -> Vec<SignalVector> {
        (0..n)
            .map(|i| {
                let t = i as f64 / n as f64;
                SignalVector::new([
                    t,
                    -t,
                    (i as f64 * 1.7).sin(),
                    0.5 * t + 0.1,
                    0.25,
                ])
            })
            .collect()
    }

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate_inputs() {
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let matrix = matrix_from_vectors(&vectors(40), 30).unwrap();
        for a in IndicatorKind::ALL {
            assert_eq!(matrix.get(a, a), 1.0);
            for b in IndicatorKind::ALL {
                assert_eq!(matrix.get(a, b), matrix.get(b, a));
                assert!(matrix.get(a, b).abs() <= 1.0);
            }
        }
        assert!((matrix.get(IndicatorKind::Rsi, IndicatorKind::Macd) + 1.0).abs() < 1e-9);
        assert!((matrix.get(IndicatorKind::Rsi, IndicatorKind::Ema) - 1.0).abs() < 1e-9);
        assert_eq!(matrix.get(IndicatorKind::Rsi, IndicatorKind::Volume), 0.0);
    }

    #[test]
    fn test_matrix_requires_minimum_history() {
        let err = matrix_from_vectors(&vectors(10), 30).unwrap_err();
        assert_eq!(
            err,
            SignalError::InsufficientHistory {
                required: 30,
                actual: 10
            }
        );
    }

    #[test]
    fn test_matrix_is_deterministic() {
        let input = vectors(50);
        assert_eq!(
            matrix_from_vectors(&input, 30).unwrap(),
            matrix_from_vectors(&input, 30).unwrap()
        );
    }

    #[test]
    fn test_strong_correlations_sorted_and_capped() {
        let mut matrix = CorrelationMatrix::identity();
        matrix.set(IndicatorKind::Ema, IndicatorKind::Bollinger, -0.9);
        matrix.set(IndicatorKind::Rsi, IndicatorKind::Macd, 0.7);
        matrix.set(IndicatorKind::Rsi, IndicatorKind::Volume, 0.7);
        matrix.set(IndicatorKind::Macd, IndicatorKind::Ema, 0.5);
        matrix.set(IndicatorKind::Macd, IndicatorKind::Volume, 0.2);

        let strong = strong_correlations(&matrix, 0.5, 5);
        assert_eq!(strong.len(), 3);
        assert_eq!(strong[0].indicator1, IndicatorKind::Bollinger);
        assert_eq!(strong[0].indicator2, IndicatorKind::Ema);
        assert_eq!(strong[0].correlation, -0.9);
        // Tie at 0.7 broken by the second indicator's name.
        assert_eq!(strong[1].indicator2, IndicatorKind::Macd);
        assert_eq!(strong[2].indicator2, IndicatorKind::Volume);

        assert_eq!(strong_correlations(&matrix, 0.5, 1).len(), 1);
    }
}
