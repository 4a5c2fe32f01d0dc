//! Bollinger Bands indicator.

use crate::error::SignalError;
use crate::services::signals::{ensure_periods, make_indicator_result, Indicator};
use crate::types::{IndicatorKind, IndicatorResult, PricePoint, RawValue, SignalCategory};

/// Position below which price is "near the lower band".
const LOWER_ZONE: f64 = 0.2;
/// Position above which price is "near the upper band".
const UPPER_ZONE: f64 = 0.8;

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// Price near lower band = oversold (bullish), near upper band = overbought (bearish).
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

/// Band levels for the latest window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Where `price` sits between the bands, clamped to [0, 1].
    /// A zero-width band puts price in the middle.
    pub fn position(&self, price: f64) -> f64 {
        let width = self.upper - self.lower;
        if width <= 0.0 {
            return 0.5;
        }
        ((price - self.lower) / width).clamp(0.0, 1.0)
    }
}

impl BollingerBands {
    /// Sample standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
        variance.sqrt()
    }

    /// Bands over the last `period` prices.
    pub fn bands(&self, prices: &[f64]) -> Option<Bands> {
        if self.period == 0 || prices.len() < self.period {
            return None;
        }

        let window = &prices[prices.len() - self.period..];
        let middle = window.iter().sum::<f64>() / self.period as f64;
        let std_dev = Self::std_dev(window, middle);

        Some(Bands {
            upper: middle + self.std_dev_multiplier * std_dev,
            middle,
            lower: middle - self.std_dev_multiplier * std_dev,
        })
    }

    /// Lower band maps to +1 (buy), upper band to -1 (sell).
    pub fn normalize(position: f64) -> f64 {
        (0.5 - position.clamp(0.0, 1.0)) * 2.0
    }
}

impl Indicator for BollingerBands {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Bollinger
    }

    fn name(&self) -> &str {
        "Bollinger Bands (20, 2)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, points: &[PricePoint]) -> Result<IndicatorResult, SignalError> {
        ensure_periods(self, points)?;

        let prices = crate::types::prices(points);
        let bands = self.bands(&prices).ok_or(SignalError::InsufficientData {
            indicator: self.kind(),
            required: self.min_periods(),
            actual: points.len(),
        })?;

        let current_price = prices[prices.len() - 1];
        let position = bands.position(current_price);

        let (signal, description) = if position < LOWER_ZONE {
            (1, "BUY - Near lower band")
        } else if position > UPPER_ZONE {
            (-1, "SELL - Near upper band")
        } else {
            (0, "HOLD - Middle range")
        };

        make_indicator_result(
            self,
            points,
            RawValue::components([
                ("upper", bands.upper),
                ("middle", bands.middle),
                ("lower", bands.lower),
                ("position", position),
            ]),
            signal,
            Self::normalize(position),
            description,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PricePoint::new(i as i64 * 3_600_000, *p, 10.0))
            .collect()
    }

    fn oscillating(last: f64) -> Vec<f64> {
        let mut prices: Vec<f64> = (0..19).map(|i| if i % 2 == 0 { 98.0 } else { 102.0 }).collect();
        prices.push(last);
        prices
    }

    #[test]
    fn test_bollinger_bands_known_values() {
        let prices: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let bands = BollingerBands::default().bands(&prices).unwrap();
        // mean 10.5, sample variance 35
        assert!((bands.middle - 10.5).abs() < 1e-12);
        assert!((bands.upper - (10.5 + 2.0 * 35f64.sqrt())).abs() < 1e-9);
        assert!((bands.lower - (10.5 - 2.0 * 35f64.sqrt())).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_flat_series_mid_position() {
        let result = BollingerBands::default().calculate(&series(&[100.0; 20])).unwrap();
        assert_eq!(result.raw_value.component("position"), Some(0.5));
        assert_eq!(result.signal, 0);
        assert_eq!(result.continuous_signal, 0.0);
    }

    #[test]
    fn test_bollinger_near_lower_band_is_buy() {
        let result = BollingerBands::default().calculate(&series(&oscillating(94.0))).unwrap();
        assert_eq!(result.signal, 1);
        assert!(result.continuous_signal > 0.6);
        assert_eq!(result.description, "BUY - Near lower band");
    }

    #[test]
    fn test_bollinger_near_upper_band_is_sell() {
        let result = BollingerBands::default().calculate(&series(&oscillating(106.0))).unwrap();
        assert_eq!(result.signal, -1);
        assert!(result.continuous_signal < -0.6);
    }

    #[test]
    fn test_bollinger_position_clamped() {
        let bands = Bands {
            upper: 110.0,
            middle: 100.0,
            lower: 90.0,
        };
        assert_eq!(bands.position(200.0), 1.0);
        assert_eq!(bands.position(0.0), 0.0);
        assert_eq!(BollingerBands::normalize(bands.position(200.0)), -1.0);
        assert_eq!(BollingerBands::normalize(bands.position(0.0)), 1.0);
    }

    #[test]
    fn test_bollinger_overflowing_prices_fail() {
        let prices: Vec<f64> = (0..40).map(|i| 1e307 * (1.0 + i as f64 * 0.01)).collect();
        let err = BollingerBands::default().calculate(&series(&prices)).unwrap_err();
        assert!(matches!(err, SignalError::MalformedSeries(_)));
    }

    #[test]
    fn test_bollinger_insufficient_data() {
        let err = BollingerBands::default().calculate(&series(&[1.0; 5])).unwrap_err();
        assert!(matches!(
            err,
            SignalError::InsufficientData {
                indicator: IndicatorKind::Bollinger,
                required: 20,
                actual: 5
            }
        ));
    }
}
