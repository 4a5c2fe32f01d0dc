use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::SignalError;

/// The five indicators the composite methods combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndicatorKind {
    #[serde(rename = "RSI")]
    Rsi,
    #[serde(rename = "MACD")]
    Macd,
    #[serde(rename = "Bollinger")]
    Bollinger,
    #[serde(rename = "EMA")]
    Ema,
    #[serde(rename = "Volume")]
    Volume,
}

impl IndicatorKind {
    /// All indicators, in signal-vector order.
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Bollinger,
        IndicatorKind::Ema,
        IndicatorKind::Volume,
    ];

    /// Number of indicators in a signal vector.
    pub const COUNT: usize = 5;

    /// Position of this indicator in a [`SignalVector`].
    pub fn index(&self) -> usize {
        match self {
            IndicatorKind::Rsi => 0,
            IndicatorKind::Macd => 1,
            IndicatorKind::Bollinger => 2,
            IndicatorKind::Ema => 3,
            IndicatorKind::Volume => 4,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Bollinger => "Bollinger",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Volume => "Volume",
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a trading signal indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Trend,
    Momentum,
    Volatility,
    Volume,
}

/// Native indicator reading: a number, or named components such as band levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Scalar(f64),
    Components(BTreeMap<String, f64>),
}

impl RawValue {
    /// Build a component mapping from `(name, value)` pairs.
    pub fn components<const N: usize>(pairs: [(&str, f64); N]) -> Self {
        RawValue::Components(
            pairs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    /// Scalar value, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            RawValue::Scalar(v) => Some(*v),
            RawValue::Components(_) => None,
        }
    }

    /// True when every number in the reading is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            RawValue::Scalar(v) => v.is_finite(),
            RawValue::Components(map) => map.values().all(|v| v.is_finite()),
        }
    }

    /// Look up a named component.
    pub fn component(&self, name: &str) -> Option<f64> {
        match self {
            RawValue::Scalar(_) => None,
            RawValue::Components(map) => map.get(name).copied(),
        }
    }
}

/// Output from a single indicator calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorResult {
    pub kind: IndicatorKind,
    /// Display name (e.g., "RSI (14)").
    pub name: String,
    pub category: SignalCategory,
    pub raw_value: RawValue,
    /// Presentation-only tri-state: -1, 0 or +1.
    pub signal: i8,
    /// Normalized signal in [-1, +1]; the only value composite methods read.
    pub continuous_signal: f64,
    pub description: String,
    /// Timestamp (ms) of the last point the indicator saw.
    pub timestamp: i64,
}

/// Five continuous signals in [`IndicatorKind::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalVector(pub [f64; IndicatorKind::COUNT]);

impl SignalVector {
    pub fn new(values: [f64; IndicatorKind::COUNT]) -> Self {
        Self(values)
    }

    /// Build from a keyed set, failing if any indicator is absent or non-finite.
    pub fn from_map(signals: &BTreeMap<IndicatorKind, f64>) -> Result<Self, SignalError> {
        let mut values = [0.0; IndicatorKind::COUNT];
        let mut missing = Vec::new();

        for kind in IndicatorKind::ALL {
            match signals.get(&kind) {
                Some(v) if v.is_finite() => values[kind.index()] = *v,
                _ => missing.push(kind),
            }
        }

        if missing.is_empty() {
            Ok(Self(values))
        } else {
            Err(SignalError::IncompleteSignalSet { missing })
        }
    }

    pub fn get(&self, kind: IndicatorKind) -> f64 {
        self.0[kind.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_map(&self) -> BTreeMap<IndicatorKind, f64> {
        IndicatorKind::ALL
            .iter()
            .map(|kind| (*kind, self.get(*kind)))
            .collect()
    }
}

/// Five-level recommendation derived from a score in [-1, +1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

/// Directional family of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignClass {
    Buy,
    Hold,
    Sell,
}

impl Recommendation {
    /// Map a score to a label.
    ///
    /// `>= 0.6` strong buy, `[0.2, 0.6)` buy, `(-0.2, 0.2)` hold,
    /// `(-0.6, -0.2]` sell, `<= -0.6` strong sell.
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.6 => Recommendation::StrongBuy,
            s if s >= 0.2 => Recommendation::Buy,
            s if s > -0.2 => Recommendation::Hold,
            s if s > -0.6 => Recommendation::Sell,
            s if s <= -0.6 => Recommendation::StrongSell,
            // NaN
            _ => Recommendation::Hold,
        }
    }

    pub fn sign_class(&self) -> SignClass {
        match self {
            Recommendation::StrongBuy | Recommendation::Buy => SignClass::Buy,
            Recommendation::Hold => SignClass::Hold,
            Recommendation::Sell | Recommendation::StrongSell => SignClass::Sell,
        }
    }

    /// Get display label for this recommendation.
    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG SELL",
        }
    }
}

/// Composite scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMethod {
    SimpleWeighted,
    CorrelationAdjusted,
    Mahalanobis,
}

impl CompositeMethod {
    pub const ALL: [CompositeMethod; 3] = [
        CompositeMethod::SimpleWeighted,
        CompositeMethod::CorrelationAdjusted,
        CompositeMethod::Mahalanobis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CompositeMethod::SimpleWeighted => "simple_weighted",
            CompositeMethod::CorrelationAdjusted => "correlation_adjusted",
            CompositeMethod::Mahalanobis => "mahalanobis",
        }
    }
}

/// Clamp a score into [-1, +1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Conviction in [0, 100] derived from score magnitude.
pub fn confidence_from_score(score: f64) -> f64 {
    (score.abs() * 100.0).min(100.0)
}

/// Score produced by one composite method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScore {
    pub method: CompositeMethod,
    pub score: f64,
    pub recommendation: Recommendation,
    pub confidence: f64,
}

impl CompositeScore {
    pub fn new(method: CompositeMethod, raw_score: f64) -> Self {
        let score = clamp_unit(raw_score);
        Self {
            method,
            score,
            recommendation: Recommendation::from_score(score),
            confidence: confidence_from_score(score),
        }
    }
}

/// Per-indicator view of the continuous signal with its own label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualSignal {
    pub signal: f64,
    pub recommendation: Recommendation,
}

impl IndividualSignal {
    pub fn new(signal: f64) -> Self {
        Self {
            signal,
            recommendation: Recommendation::from_score(signal),
        }
    }
}

/// Where the Mahalanobis covariance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceSource {
    Historical,
    /// Not enough (or degenerate) history; distances are Euclidean.
    Identity,
}

/// Distances from the current signal vector to each prototype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MahalanobisDistances {
    pub neutral: f64,
    pub bullish: f64,
    pub bearish: f64,
    pub covariance: CovarianceSource,
}

/// Cross-method agreement for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub scores: Vec<f64>,
    pub average_score: f64,
    pub recommendation: Recommendation,
    /// False when at least one method leans buy while another leans sell.
    pub agreement: bool,
}

impl ConsensusResult {
    /// "AGREE" or "MIXED".
    pub fn label(&self) -> &'static str {
        if self.agreement {
            "AGREE"
        } else {
            "MIXED"
        }
    }
}

/// Symmetric Pearson correlation matrix over [`IndicatorKind::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    values: [[f64; IndicatorKind::COUNT]; IndicatorKind::COUNT],
}

impl CorrelationMatrix {
    /// Identity matrix: every indicator uncorrelated with its peers.
    pub fn identity() -> Self {
        let mut values = [[0.0; IndicatorKind::COUNT]; IndicatorKind::COUNT];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { values }
    }

    pub fn get(&self, a: IndicatorKind, b: IndicatorKind) -> f64 {
        self.values[a.index()][b.index()]
    }

    /// Set a pair symmetrically. Diagonal entries are fixed at 1.
    pub fn set(&mut self, a: IndicatorKind, b: IndicatorKind, value: f64) {
        if a == b {
            return;
        }
        let value = value.clamp(-1.0, 1.0);
        self.values[a.index()][b.index()] = value;
        self.values[b.index()][a.index()] = value;
    }

    /// Mean absolute correlation of `kind` with every other indicator.
    pub fn average_abs_correlation(&self, kind: IndicatorKind) -> f64 {
        let others: Vec<f64> = IndicatorKind::ALL
            .iter()
            .filter(|other| **other != kind)
            .map(|other| self.get(kind, *other).abs())
            .collect();
        others.iter().sum::<f64>() / others.len() as f64
    }

    /// Nested `{row: {column: r}}` mapping.
    pub fn to_nested_map(&self) -> BTreeMap<IndicatorKind, BTreeMap<IndicatorKind, f64>> {
        IndicatorKind::ALL
            .iter()
            .map(|row| {
                let cols = IndicatorKind::ALL
                    .iter()
                    .map(|col| (*col, self.get(*row, *col)))
                    .collect();
                (*row, cols)
            })
            .collect()
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nested_map().serialize(serializer)
    }
}

/// Indicator pair whose signal histories move together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrongCorrelation {
    pub indicator1: IndicatorKind,
    pub indicator2: IndicatorKind,
    pub correlation: f64,
}

/// All method outputs for one evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResults {
    pub individual_signals: BTreeMap<IndicatorKind, IndividualSignal>,
    pub simple_weighted: CompositeScore,
    pub correlation_adjusted: CompositeScore,
    pub mahalanobis: CompositeScore,
    /// Final weights used by the correlation-adjusted method.
    pub correlation_weights: BTreeMap<IndicatorKind, f64>,
    pub mahalanobis_distances: MahalanobisDistances,
}

impl MethodResults {
    pub fn scores(&self) -> [CompositeScore; 3] {
        [self.simple_weighted, self.correlation_adjusted, self.mahalanobis]
    }

    pub fn score_map(&self) -> BTreeMap<CompositeMethod, f64> {
        self.scores().iter().map(|s| (s.method, s.score)).collect()
    }
}

/// Full result of evaluating one asset's series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub asset: String,
    /// Timestamp (ms) of the newest point in the evaluated series.
    pub timestamp: i64,
    pub current_price: f64,
    pub indicators: BTreeMap<IndicatorKind, IndicatorResult>,
    pub methods: MethodResults,
    pub consensus: ConsensusResult,
    /// Absent when the asset's history is too short to correlate.
    pub correlation_matrix: Option<CorrelationMatrix>,
    pub strong_correlations: Vec<StrongCorrelation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_boundaries() {
        assert_eq!(Recommendation::from_score(0.6), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(0.599999), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(0.2), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(0.199999), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(-0.199999), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(-0.2), Recommendation::Sell);
        assert_eq!(Recommendation::from_score(-0.599999), Recommendation::Sell);
        assert_eq!(Recommendation::from_score(-0.6), Recommendation::StrongSell);
        assert_eq!(Recommendation::from_score(-1.0), Recommendation::StrongSell);
        assert_eq!(Recommendation::from_score(f64::NAN), Recommendation::Hold);
    }

    #[test]
    fn test_sign_classes() {
        assert_eq!(Recommendation::StrongBuy.sign_class(), SignClass::Buy);
        assert_eq!(Recommendation::Buy.sign_class(), SignClass::Buy);
        assert_eq!(Recommendation::Hold.sign_class(), SignClass::Hold);
        assert_eq!(Recommendation::Sell.sign_class(), SignClass::Sell);
        assert_eq!(Recommendation::StrongSell.sign_class(), SignClass::Sell);
    }

    #[test]
    fn test_recommendation_serialization() {
        let json = serde_json::to_string(&Recommendation::StrongBuy).unwrap();
        assert_eq!(json, "\"STRONG_BUY\"");
        let parsed: Recommendation = serde_json::from_str("\"STRONG_SELL\"").unwrap();
        assert_eq!(parsed, Recommendation::StrongSell);
    }

    #[test]
    fn test_composite_score_clamps_and_labels() {
        let score = CompositeScore::new(CompositeMethod::SimpleWeighted, 1.4);
        assert_eq!(score.score, 1.0);
        assert_eq!(score.recommendation, Recommendation::StrongBuy);
        assert_eq!(score.confidence, 100.0);

        let score = CompositeScore::new(CompositeMethod::Mahalanobis, -0.25);
        assert_eq!(score.recommendation, Recommendation::Sell);
        assert!((score.confidence - 25.0).abs() < 1e-9);

        let score = CompositeScore::new(CompositeMethod::Mahalanobis, f64::NAN);
        assert_eq!(score.score, 0.0);
    }

    #[test]
    fn test_signal_vector_from_complete_map() {
        let map: BTreeMap<IndicatorKind, f64> = IndicatorKind::ALL
            .iter()
            .enumerate()
            .map(|(i, k)| (*k, i as f64 / 10.0))
            .collect();
        let vector = SignalVector::from_map(&map).unwrap();
        assert_eq!(vector.get(IndicatorKind::Ema), 0.3);
        assert_eq!(vector.to_map(), map);
    }

    #[test]
    fn test_signal_vector_reports_missing() {
        let mut map = BTreeMap::new();
        map.insert(IndicatorKind::Rsi, 0.1);
        map.insert(IndicatorKind::Macd, 0.2);
        map.insert(IndicatorKind::Bollinger, f64::NAN);
        let err = SignalVector::from_map(&map).unwrap_err();
        assert_eq!(
            err,
            SignalError::IncompleteSignalSet {
                missing: vec![
                    IndicatorKind::Bollinger,
                    IndicatorKind::Ema,
                    IndicatorKind::Volume
                ]
            }
        );
    }

    #[test]
    fn test_indicator_kind_wire_names() {
        let json = serde_json::to_string(&IndicatorKind::Bollinger).unwrap();
        assert_eq!(json, "\"Bollinger\"");
        let parsed: IndicatorKind = serde_json::from_str("\"EMA\"").unwrap();
        assert_eq!(parsed, IndicatorKind::Ema);

        let mut map = BTreeMap::new();
        map.insert(IndicatorKind::Rsi, 1);
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"RSI":1}"#);
    }

    #[test]
    fn test_correlation_matrix_symmetry() {
        let mut matrix = CorrelationMatrix::identity();
        matrix.set(IndicatorKind::Ema, IndicatorKind::Bollinger, -0.8);
        matrix.set(IndicatorKind::Rsi, IndicatorKind::Rsi, 0.2);

        assert_eq!(matrix.get(IndicatorKind::Bollinger, IndicatorKind::Ema), -0.8);
        assert_eq!(matrix.get(IndicatorKind::Rsi, IndicatorKind::Rsi), 1.0);
        assert!((matrix.average_abs_correlation(IndicatorKind::Ema) - 0.2).abs() < 1e-12);

        let json = serde_json::to_value(&matrix).unwrap();
        assert_eq!(json["EMA"]["Bollinger"], -0.8);
        assert_eq!(json["Volume"]["Volume"], 1.0);
    }

    #[test]
    fn test_consensus_label() {
        let consensus = ConsensusResult {
            scores: vec![0.1, 0.2, 0.3],
            average_score: 0.2,
            recommendation: Recommendation::Buy,
            agreement: false,
        };
        assert_eq!(consensus.label(), "MIXED");
    }
}
