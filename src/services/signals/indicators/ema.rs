//! Exponential Moving Average (EMA) indicator.

use crate::error::SignalError;
use crate::services::signals::{ensure_periods, make_indicator_result, Indicator};
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Price must sit this far (as a ratio) from the EMA before the display signal fires.
const DEADBAND: f64 = 0.02;

/// Recursive EMA seeded with the first value, `alpha = 2 / (span + 1)`.
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let Some(first) = values.first() else {
        return Vec::new();
    };

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut ema = Vec::with_capacity(values.len());
    ema.push(*first);

    for value in &values[1..] {
        let prev = ema[ema.len() - 1];
        ema.push(alpha * value + (1.0 - alpha) * prev);
    }

    ema
}

/// EMA (Exponential Moving Average) indicator.
///
/// Signal based on price position relative to EMA:
/// - Price above EMA = bullish
/// - Price below EMA = bearish
pub struct Ema {
    period: usize,
}

impl Default for Ema {
    fn default() -> Self {
        Self { period: 20 }
    }
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// `tanh((price / ema - 1) * 2)`.
    pub fn normalize(ratio: f64) -> f64 {
        ((ratio - 1.0) * 2.0).tanh()
    }
}

impl Indicator for Ema {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Ema
    }

    fn name(&self) -> &str {
        "EMA (20)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError> {
        ensure_periods(self, points)?;

        let prices = crate::types::prices(points);
        let ema = ema_series(&prices, self.period)
            .last()
            .copied()
            .unwrap_or_default();
        let current_price = prices[prices.len() - 1];

        let ratio = if ema > 0.0 { current_price / ema } else { 1.0 };

        let (signal, description) = if ratio > 1.0 + DEADBAND {
            (1, "BUY - Above EMA")
        } else if ratio < 1.0 - DEADBAND {
            (-1, "SELL - Below EMA")
        } else {
            (0, "HOLD - Near EMA")
        };

        make_indicator_result(
            self,
            points,
            RawValue::Scalar(ema),
            signal,
            Self::normalize(ratio),
            description,
        )
    }
}
