use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SignalError;

/// A single observation of an asset's market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    /// Spot price.
    pub price: f64,
    /// Traded volume for the interval ending at `timestamp`.
    pub volume: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

/// Reject series that no indicator should ever see.
///
/// Timestamps must be representable dates and strictly increasing; prices and
/// volumes must be finite and non-negative.
pub fn validate_series(points: &[PricePoint]) -> Result<(), SignalError> {
    if points.is_empty() {
        return Err(SignalError::MalformedSeries("series is empty".to_string()));
    }

    for (i, point) in points.iter().enumerate() {
        if !point.price.is_finite() || point.price < 0.0 {
            return Err(SignalError::MalformedSeries(format!(
                "invalid price {} at index {}",
                point.price, i
            )));
        }
        if !point.volume.is_finite() || point.volume < 0.0 {
            return Err(SignalError::MalformedSeries(format!(
                "invalid volume {} at index {}",
                point.volume, i
            )));
        }
        if Utc.timestamp_millis_opt(point.timestamp).single().is_none() {
            return Err(SignalError::MalformedSeries(format!(
                "timestamp {} out of range at index {}",
                point.timestamp, i
            )));
        }
    }

    if let Some(i) = points
        .windows(2)
        .position(|pair| pair[1].timestamp <= pair[0].timestamp)
    {
        return Err(SignalError::MalformedSeries(format!(
            "timestamps not strictly increasing at index {}",
            i + 1
        )));
    }

    Ok(())
}

/// Extract closing prices.
pub fn prices(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.price).collect()
}

/// Extract volumes.
pub fn volumes(points: &[PricePoint]) -> Vec<f64> {
    points.iter().map(|p| p.volume).collect()
}
