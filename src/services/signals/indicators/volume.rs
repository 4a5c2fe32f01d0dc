//! Volume surge indicator.

use crate::error::SignalError;
use crate::services::signals::{discrete_sign, ensure_periods, make_indicator_result, Indicator};
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Continuous signal magnitude needed before the display signal fires.
const DEADBAND: f64 = 0.45;

/// Volume indicator.
///
/// Compares short-term to long-term average volume. A surge only confirms the
/// trend the price is already making: rising volume on a falling price is bearish.
pub struct VolumeTrend {
    short_period: usize,
    long_period: usize,
    /// Points back used to measure price direction.
    price_lookback: usize,
}

impl Default for VolumeTrend {
    fn default() -> Self {
        Self {
            short_period: 5,
            long_period: 20,
            price_lookback: 5,
        }
    }
}

/// Volume readings for the latest window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeAnalysis {
    pub volume_ratio: f64,
    /// Percentage price change over the lookback.
    pub price_change: f64,
    pub avg_volume: f64,
}

fn tail_mean(values: &[f64], period: usize) -> f64 {
    let window = &values[values.len().saturating_sub(period)..];
    if window.is_empty() {
        return 0.0;
    }
    window.iter().sum::<f64>() / window.len() as f64
}

impl VolumeTrend {
    pub fn analyze(&self, points: &[PricePoint]) -> Option<VolumeAnalysis> {
        if points.len() < self.long_period.max(self.price_lookback) {
            return None;
        }

        let volumes = crate::types::volumes(points);
        let recent = tail_mean(&volumes, self.short_period);
        let avg_volume = tail_mean(&volumes, self.long_period);
        let volume_ratio = if avg_volume > 0.0 {
            recent / avg_volume
        } else {
            1.0
        };

        let last = points[points.len() - 1].price;
        let base = points[points.len() - self.price_lookback].price;
        let price_change = if base > 0.0 {
            (last - base) / base * 100.0
        } else {
            0.0
        };

        Some(VolumeAnalysis {
            volume_ratio,
            price_change,
            avg_volume,
        })
    }

    /// `tanh(ratio - 1)`, signed by the direction price moved.
    pub fn normalize(volume_ratio: f64, price_change: f64) -> f64 {
        let direction = if price_change > 0.0 {
            1.0
        } else if price_change < 0.0 {
            -1.0
        } else {
            0.0
        };
        (volume_ratio - 1.0).tanh() * direction
    }
}

impl Indicator for VolumeTrend {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Volume
    }

    fn name(&self) -> &str {
        "Volume (5/20)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volume
    }

    fn min_periods(&self) -> usize {
        self.long_period.max(self.price_lookback)
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError> {
        ensure_periods(self, points)?;

        let analysis = self.analyze(points).ok_or(SignalError::InsufficientData {
            indicator: self.kind(),
            required: self.min_periods(),
            actual: points.len(),
        })?;

        let continuous = Self::normalize(analysis.volume_ratio, analysis.price_change);
        let signal = discrete_sign(continuous, DEADBAND);
        let description = match signal {
            1 if analysis.volume_ratio >= 1.0 => "BUY - High volume uptrend",
            1 => "BUY - Selling volume drying up",
            -1 if analysis.volume_ratio >= 1.0 => "SELL - High volume downtrend",
            -1 => "SELL - Buying volume drying up",
            _ => "HOLD - Normal volume",
        };

        make_indicator_result(
            self,
            points,
            RawValue::components([
                ("volumeRatio", analysis.volume_ratio),
                ("priceChange", analysis.price_change),
                ("avgVolume", analysis.avg_volume),
            ]),
            signal,
            continuous,
            description,
        )
    }
}
