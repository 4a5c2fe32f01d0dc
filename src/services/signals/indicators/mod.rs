//! Technical indicator implementations.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod volume;

pub use bollinger::BollingerBands;
pub use ema::Ema;
pub use macd::Macd;
pub use rsi::Rsi;
pub use volume::VolumeTrend;

use super::Indicator;

/// Get all indicators that feed the composite methods.
pub fn all_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Rsi::default()),
        Box::new(Macd::default()),
        Box::new(BollingerBands::default()),
        Box::new(Ema::default()),
        Box::new(VolumeTrend::default()),
    ]
}

/// Longest lookback across `indicators`.
pub fn max_min_periods(indicators: &[Box<dyn Indicator>]) -> usize {
    indicators
        .iter()
        .map(|i| i.min_periods())
        .max()
        .unwrap_or_default()
}
