//! Adaptive multi-layer prediction engine
//!
//! Combines four independently scored signal layers (hard market data,
//! technical structure, subconscious/sentiment, macro-economic) into a
//! single directional forecast with calibrated confidence and risk, and
//! continuously re-weights the layers by how well each has performed:
//!
//! 1. A `FeatureProvider` supplies raw indicators for a symbol
//! 2. A `LayerScorer` reduces them to one score per layer plus a regime
//! 3. The weight engine turns confidence, regime, agreement and track
//!    record into fractional layer weights
//! 4. The composer folds weighted scores into a `Prediction`
//! 5. Once the horizon elapses, the resolver grades the call and feeds
//!    the result back into the performance tracker

pub mod config;
pub mod engine;
pub mod error;
pub mod providers;
pub mod types;

pub use config::{EngineSettings, WeightConfig};
pub use engine::{
    estimate_win_rate, PerformanceTracker, PredictionEngine, WeightDecision, WeightEngine,
};
pub use error::{EngineError, Result};
pub use providers::{FeatureProvider, LayerScorer, MemoryPredictionStore, PredictionStore};
pub use types::{
    AccuracyStats, Direction, FeatureSnapshot, HorizonStats, KeyFactors, Layer, LayerBreakdown,
    LayerConfidence, LayerPerformanceRecord, LayerScoreSet, LayerSet, MarketRegime, Outcome,
    Prediction, PredictionStatus, QuickPrediction, RegimeInfo, RiskLevel, TradingSession,
    TrendDirection, VolatilityLevel, WeightSet,
};
