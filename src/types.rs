//! Core types shared across the prediction engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Signal layer - the four independent sources of directional signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Hard market data: flow, positioning, insider activity
    HardData,
    /// Technical structure: price levels, RSI, liquidity
    Technical,
    /// Subconscious/sentiment analysis module (SAM)
    Subconscious,
    /// Macro-economic indicators: VIX, yield curve, consumer sentiment
    Economic,
}

impl Layer {
    /// All layers in canonical order
    pub const ALL: [Layer; 4] = [
        Layer::HardData,
        Layer::Technical,
        Layer::Subconscious,
        Layer::Economic,
    ];

    /// Short display name used in adjustment traces and key factors
    pub fn display_name(&self) -> &'static str {
        match self {
            Layer::HardData => "Hard Data",
            Layer::Technical => "Technical",
            Layer::Subconscious => "SAM",
            Layer::Economic => "Economic",
        }
    }
}

/// Fixed-size record with one slot per layer.
///
/// Used instead of a map so the per-layer rule tables get compile-time
/// exhaustiveness checking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSet<T> {
    pub hard_data: T,
    pub technical: T,
    pub subconscious: T,
    pub economic: T,
}

impl<T> LayerSet<T> {
    pub fn get(&self, layer: Layer) -> &T {
        match layer {
            Layer::HardData => &self.hard_data,
            Layer::Technical => &self.technical,
            Layer::Subconscious => &self.subconscious,
            Layer::Economic => &self.economic,
        }
    }

    pub fn get_mut(&mut self, layer: Layer) -> &mut T {
        match layer {
            Layer::HardData => &mut self.hard_data,
            Layer::Technical => &mut self.technical,
            Layer::Subconscious => &mut self.subconscious,
            Layer::Economic => &mut self.economic,
        }
    }

    /// Iterate slots in canonical layer order
    pub fn iter(&self) -> impl Iterator<Item = (Layer, &T)> {
        Layer::ALL.iter().map(move |&l| (l, self.get(l)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Layer, &T) -> U) -> LayerSet<U> {
        LayerSet {
            hard_data: f(Layer::HardData, &self.hard_data),
            technical: f(Layer::Technical, &self.technical),
            subconscious: f(Layer::Subconscious, &self.subconscious),
            economic: f(Layer::Economic, &self.economic),
        }
    }
}

impl<T: Clone> LayerSet<T> {
    pub fn uniform(value: T) -> Self {
        Self {
            hard_data: value.clone(),
            technical: value.clone(),
            subconscious: value.clone(),
            economic: value,
        }
    }
}

impl LayerSet<f64> {
    pub fn sum(&self) -> f64 {
        self.hard_data + self.technical + self.subconscious + self.economic
    }
}

/// Fractional layer weights. Invariant after `compute_weights`: sums to 1.0
pub type WeightSet = LayerSet<f64>;

/// Per-layer scorer self-reported certainty, 0..=100
pub type LayerConfidence = LayerSet<u8>;

/// Coarse market regime classification (produced externally)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    RiskOn,
    RiskOff,
    Expansion,
    Contraction,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Sideways,
}

/// Regime tags that bias layer weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeInfo {
    pub regime: MarketRegime,
    pub volatility: VolatilityLevel,
    pub trend: TrendDirection,
}

impl Default for RegimeInfo {
    fn default() -> Self {
        Self {
            regime: MarketRegime::Neutral,
            volatility: VolatilityLevel::Medium,
            trend: TrendDirection::Sideways,
        }
    }
}

/// Normalized per-layer scores plus the regime they were scored under.
///
/// Scores are in [-1, 1]: sign is direction, magnitude is strength.
/// Confidence is the scorer's self-reported certainty, independent of
/// score sign or magnitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerScoreSet {
    pub scores: LayerSet<f64>,
    pub confidences: LayerConfidence,
    pub regime: RegimeInfo,
}

/// Raw indicator snapshot produced by the external FeatureProvider.
///
/// The composer's key-factor rules and risk score read these directly;
/// the LayerScorer reduces them to a `LayerScoreSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub symbol: String,
    pub as_of: DateTime<Utc>,
    pub current_price: Option<Decimal>,

    // Hard data layer
    /// Price momentum over the lookback window, percent
    pub momentum_pct: f64,
    /// Options skew: positive = call-heavy
    pub options_skew: f64,
    /// Net dark-pool buy pressure, -1..1
    pub dark_pool_flow: f64,
    pub insider_net_buys: i32,
    pub legislator_net_buys: i32,

    // Technical layer
    pub rsi: f64,
    /// Market-structure shift detected (trend break)
    pub structure_shift: bool,
    /// Liquidity void below/above current price
    pub liquidity_void: bool,

    // Subconscious layer
    /// Aggregate sentiment, -1..1
    pub sentiment_score: f64,
    /// Disagreement between sentiment sources, 0..1
    pub sentiment_dissonance: f64,

    // Economic layer
    pub vix: f64,
    /// 10y-2y spread, negative means inverted
    pub yield_curve_spread: f64,
    pub consumer_sentiment: f64,
}

/// Trading session, used by the win-rate estimator's base-rate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSession {
    UsOpen,
    London,
    Asia,
    PreMarket,
    Closed,
}

/// Predicted direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Prediction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Pending,
    Correct,
    Incorrect,
}

/// Scores and weights that went into a prediction, kept for auditability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerBreakdown {
    pub scores: LayerSet<f64>,
    pub weights: WeightSet,
    pub confidences: LayerConfidence,
    pub regime: RegimeInfo,
}

/// Human-readable explanation of a prediction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyFactors {
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
    pub uncertain: Vec<String>,
}

/// A directional forecast.
///
/// Immutable after creation except for `status` and `outcome`, which the
/// resolver sets exactly once when the target date has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub symbol: String,
    pub prediction_date: DateTime<Utc>,
    pub horizon_days: u32,
    pub target_date: DateTime<Utc>,
    pub direction: Direction,
    /// Probability the call is right, 0.5..=0.95
    pub probability: f64,
    /// Expected move over the horizon, percent
    pub expected_return: f64,
    pub price_target: Decimal,
    pub price_at_prediction: Decimal,
    /// Calibrated confidence, 10..=95
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub layer_breakdown: LayerBreakdown,
    pub key_factors: KeyFactors,
    pub status: PredictionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Realized result attached to a resolved prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub actual_direction: Direction,
    /// Realized move, percent
    pub actual_return: f64,
    pub price_at_target: Decimal,
    pub prediction_correct: bool,
    /// |expected_return - actual_return|
    pub error_percent: f64,
}

/// Rolling accuracy estimate for one layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPerformanceRecord {
    /// Exponentially-decayed hit rate, 0..=1
    pub recent_accuracy: f64,
    /// Resolutions folded in, capped at 100
    pub sample_size: u32,
    /// Regime observed at the last update
    pub regime: MarketRegime,
    pub last_updated: DateTime<Utc>,
}

/// Lightweight forecast summary returned by `quick_predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickPrediction {
    pub direction: Direction,
    pub confidence: f64,
    pub summary: String,
}

/// Aggregate accuracy over resolved predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total: usize,
    pub correct: usize,
    /// Hit rate over resolved predictions, 0..=1
    pub accuracy: f64,
    pub avg_confidence: f64,
    pub by_horizon: HashMap<u32, HorizonStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonStats {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}
