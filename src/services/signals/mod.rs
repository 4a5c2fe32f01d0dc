//! Trading signals service module.
//!
//! Provides technical indicator calculations, the correlation engine,
//! and composite scoring across independent weighting strategies.

pub mod correlation;
pub mod engine;
pub mod indicators;
pub mod scoring;

pub use correlation::{correlation_matrix, pearson, strong_correlations};
pub use engine::SignalEngine;
pub use scoring::CompositeScorer;

use crate::error::SignalError;
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Trait for implementing technical indicators.
pub trait Indicator: Send + Sync {
    /// Which slot of the signal vector this indicator fills.
    fn kind(&self) -> IndicatorKind;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Category this indicator belongs to.
    fn category(&self) -> SignalCategory;

    /// Minimum number of points required for calculation.
    fn min_periods(&self) -> usize;

    /// Calculate the indicator from a validated series.
    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError>;
}

/// Fail with `InsufficientData` if the series is shorter than `indicator` needs.
pub fn ensure_periods<I: Indicator + ?Sized>(
    indicator: &I,
    points: &[PricePoint],
) -> Result<(), SignalError> {
    if points.len() < indicator.min_periods() {
        return Err(SignalError::InsufficientData {
            indicator: indicator.kind(),
            required: indicator.min_periods(),
            actual: points.len(),
        });
    }
    Ok(())
}

/// Helper to create an IndicatorResult.
///
/// Non-finite raw values or signals fail with `MalformedSeries`; they are
/// never clamped into a neutral reading.
pub fn make_indicator_result<I: Indicator + ?Sized>(
    indicator: &I,
    points: &[PricePoint],
    raw_value: RawValue,
    signal: i8,
    continuous_signal: f64,
    description: &str,
) -> Result<IndicatorResult, SignalError> {
    if !raw_value.is_finite() || !continuous_signal.is_finite() {
        return Err(SignalError::MalformedSeries(format!(
            "non-finite {} value",
            indicator.kind()
        )));
    }

    Ok(IndicatorResult {
        kind: indicator.kind(),
        name: indicator.name().to_string(),
        category: indicator.category(),
        raw_value,
        signal,
        continuous_signal: clamp_signal(continuous_signal),
        description: description.to_string(),
        timestamp: points.last().map(|p| p.timestamp).unwrap_or_default(),
    })
}

/// Clamp a continuous signal to [-1, +1].
pub fn clamp_signal(value: f64) -> f64 {
    crate::types::clamp_unit(value)
}

/// Tri-state sign of `value`, zero inside `[-deadband, deadband]`.
pub fn discrete_sign(value: f64, deadband: f64) -> i8 {
    if value > deadband {
        1
    } else if value < -deadband {
        -1
    } else {
        0
    }
}
