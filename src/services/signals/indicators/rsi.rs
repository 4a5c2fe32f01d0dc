//! Relative Strength Index (RSI) indicator.

use crate::error::SignalError;
use crate::services::signals::{ensure_periods, make_indicator_result, Indicator};
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Below this RSI the market is oversold.
pub const OVERSOLD: f64 = 30.0;
/// Above this RSI the market is overbought.
pub const OVERBOUGHT: f64 = 70.0;

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses,
/// using Wilder's smoothing. Values range from 0-100:
/// - Below 30: Oversold (potential buy signal)
/// - Above 70: Overbought (potential sell signal)
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// Calculate RSI value from price changes.
    ///
    /// `None` when fewer than `period` changes are available.
    pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
        if period == 0 || prices.len() < period + 1 {
            return None;
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = prices
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                if change > 0.0 {
                    (change, 0.0)
                } else {
                    (0.0, -change)
                }
            })
            .unzip();

        let mut avg_gain = gains.iter().take(period).sum::<f64>() / period as f64;
        let mut avg_loss = losses.iter().take(period).sum::<f64>() / period as f64;

        for i in period..gains.len() {
            avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
            avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        }

        if avg_loss == 0.0 {
            return Some(100.0);
        }

        let rs = avg_gain / avg_loss;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }

    /// Map RSI onto [-1, +1]: oversold ramps toward +1, overbought toward -1,
    /// the 30-70 band is neutral.
    pub fn normalize(rsi: f64) -> f64 {
        let signal = if rsi < OVERSOLD {
            (OVERSOLD - rsi) / 30.0
        } else if rsi > OVERBOUGHT {
            (OVERBOUGHT - rsi) / 30.0
        } else {
            0.0
        };
        signal.clamp(-1.0, 1.0)
    }

    pub fn discrete_signal(rsi: f64) -> i8 {
        if rsi < OVERSOLD {
            1
        } else if rsi > OVERBOUGHT {
            -1
        } else {
            0
        }
    }

    fn describe(signal: i8) -> &'static str {
        match signal {
            1 => "BUY - Oversold",
            -1 => "SELL - Overbought",
            _ => "HOLD - Neutral",
        }
    }
}

impl Indicator for Rsi {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi
    }

    fn name(&self) -> &str {
        "RSI (14)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Momentum
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError> {
        ensure_periods(self, points)?;

        let prices = crate::types::prices(points);
        let rsi = Self::calculate_rsi(&prices, self.period).ok_or(
            SignalError::InsufficientData {
                indicator: self.kind(),
                required: self.min_periods(),
                actual: points.len(),
            },
        )?;

        let signal = Self::discrete_signal(rsi);
        make_indicator_result(
            self,
            points,
            RawValue::Scalar(rsi),
            signal,
            Self::normalize(rsi),
            Self::describe(signal),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uptrend(count: usize) -> Vec<PricePoint> {
        (0..count)
            .map(|i| PricePoint::new(1_000_000 + i as i64 * 60_000, 100.0 + i as f64 * 1.5, 1000.0))
            .collect()
    }

    fn create_downtrend(count: usize) -> Vec<PricePoint> {
        (0..count)
            .map(|i| PricePoint::new(1_000_000 + i as i64 * 60_000, 200.0 - i as f64 * 1.5, 1000.0))
            .collect()
    }

    fn create_zigzag(count: usize) -> Vec<PricePoint> {
        (0..count)
            .map(|i| {
                let price = if i % 2 == 0 { 100.0 } else { 101.0 };
                PricePoint::new(1_000_000 + i as i64 * 60_000, price, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_rsi_min_periods() {
        assert_eq!(Rsi::default().min_periods(), 15);
        assert_eq!(Rsi::new(7).min_periods(), 8);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let err = Rsi::default().calculate(&create_uptrend(14)).unwrap_err();
        assert_eq!(
            err,
            SignalError::InsufficientData {
                indicator: IndicatorKind::Rsi,
                required: 15,
                actual: 14,
            }
        );
    }

    #[test]
    fn test_rsi_uptrend_saturates() {
        let result = Rsi::default().calculate(&create_uptrend(50)).unwrap();
        assert_eq!(result.raw_value.as_scalar(), Some(100.0));
        assert_eq!(result.signal, -1);
        assert_eq!(result.continuous_signal, -1.0);
        assert_eq!(result.description, "SELL - Overbought");
    }

    #[test]
    fn test_rsi_downtrend_oversold() {
        let result = Rsi::default().calculate(&create_downtrend(50)).unwrap();
        assert_eq!(result.raw_value.as_scalar(), Some(0.0));
        assert_eq!(result.signal, 1);
        assert_eq!(result.continuous_signal, 1.0);
    }

    #[test]
    fn test_rsi_zigzag_is_neutral() {
        let result = Rsi::default().calculate(&create_zigzag(40)).unwrap();
        let rsi = result.raw_value.as_scalar().unwrap();
        assert!(rsi > 40.0 && rsi < 60.0, "zigzag RSI should be near 50, got {}", rsi);
        assert_eq!(result.signal, 0);
        assert_eq!(result.continuous_signal, 0.0);
    }

    #[test]
    fn test_rsi_discrete_thresholds() {
        assert_eq!(Rsi::discrete_signal(29.0), 1);
        assert_eq!(Rsi::discrete_signal(71.0), -1);
        assert_eq!(Rsi::discrete_signal(50.0), 0);
        assert_eq!(Rsi::discrete_signal(30.0), 0);
        assert_eq!(Rsi::discrete_signal(70.0), 0);
    }

    #[test]
    fn test_rsi_normalization() {
        assert_eq!(Rsi::normalize(0.0), 1.0);
        assert!((Rsi::normalize(15.0) - 0.5).abs() < 1e-12);
        assert_eq!(Rsi::normalize(45.0), 0.0);
        assert!((Rsi::normalize(85.0) + 0.5).abs() < 1e-12);
        assert_eq!(Rsi::normalize(100.0), -1.0);
    }

    #[test]
    fn test_rsi_known_value() {
        // Seven +2 changes and seven -1 changes: RS = 14/7 = 2, RSI = 66.67.
        let mut prices = vec![100.0];
        for i in 0..14 {
            let last = *prices.last().unwrap();
            prices.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let rsi = Rsi::calculate_rsi(&prices, 14).unwrap();
        assert!((rsi - 200.0 / 3.0).abs() < 1e-9);
    }
}
