//! MACD (Moving Average Convergence Divergence) indicator.

use super::ema::ema_series;
use crate::error::SignalError;
use crate::services::signals::{discrete_sign, ensure_periods, make_indicator_result, Indicator};
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Histograms smaller than this are treated as flat.
const EPSILON: f64 = 1e-9;

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// Latest MACD readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValues {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Macd {
    /// Compute the latest MACD line, signal line and histogram.
    pub fn values(&self, prices: &[f64]) -> Option<MacdValues> {
        if prices.len() < self.slow_period {
            return None;
        }

        let fast = ema_series(prices, self.fast_period);
        let slow = ema_series(prices, self.slow_period);
        let macd_line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal_line = ema_series(&macd_line, self.signal_period);

        let macd = *macd_line.last()?;
        let signal = *signal_line.last()?;
        Some(MacdValues {
            macd,
            signal,
            histogram: macd - signal,
        })
    }

    /// `tanh(histogram / 100)`.
    pub fn normalize(histogram: f64) -> f64 {
        (histogram / 100.0).tanh()
    }
}

impl Indicator for Macd {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Macd
    }

    fn name(&self) -> &str {
        "MACD (12, 26, 9)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.slow_period
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError> {
        ensure_periods(self, points)?;

        let prices = crate::types::prices(points);
        let values = self
            .values(&prices)
            .ok_or(SignalError::InsufficientData {
                indicator: self.kind(),
                required: self.min_periods(),
                actual: points.len(),
            })?;

        let signal = discrete_sign(values.histogram, EPSILON);
        let description = match signal {
            1 => "BUY - Bullish crossover",
            -1 => "SELL - Bearish crossover",
            _ => "HOLD - No clear signal",
        };

        make_indicator_result(
            self,
            points,
            RawValue::components([
                ("macd", values.macd),
                ("signal", values.signal),
                ("histogram", values.histogram),
            ]),
            signal,
            Self::normalize(values.histogram),
            description,
        )
    }
}
