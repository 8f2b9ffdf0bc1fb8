//! Dynamic win-rate estimation
//!
//! Estimates expected accuracy for a prediction made right now: a session
//! base rate plus bonuses for cross-layer agreement, SAM conviction,
//! regime fit, and the historical track record. Only the global 0.95 cap
//! applies; strong multi-layer agreement is allowed to push the estimate
//! all the way up to it.

use crate::types::{
    LayerConfidence, LayerSet, MarketRegime, RegimeInfo, TradingSession, VolatilityLevel,
};

/// Hard ceiling on any estimate
const MAX_WIN_RATE: f64 = 0.95;

/// Base accuracy by trading session. Closed markets start from zero;
/// bonuses still apply so an estimate is always defined.
const SESSION_BASE_RATES: [(TradingSession, f64); 5] = [
    (TradingSession::UsOpen, 0.58),
    (TradingSession::London, 0.55),
    (TradingSession::Asia, 0.52),
    (TradingSession::PreMarket, 0.50),
    (TradingSession::Closed, 0.0),
];

/// Estimate the probability this setup resolves correctly.
///
/// Scores are on the engine's native [-1, 1] scale; `mean_layer_accuracy`
/// comes from `PerformanceTracker::mean_accuracy`.
pub fn estimate_win_rate(
    session: TradingSession,
    scores: &LayerSet<f64>,
    confidences: &LayerConfidence,
    regime: &RegimeInfo,
    mean_layer_accuracy: f64,
) -> f64 {
    let mut rate = SESSION_BASE_RATES
        .iter()
        .find(|(s, _)| *s == session)
        .map(|(_, base)| *base)
        .unwrap_or(0.0);

    // Cross-layer agreement
    let positive = scores.iter().filter(|(_, &s)| s > 0.0).count();
    let negative = scores.iter().filter(|(_, &s)| s < 0.0).count();
    if positive == 4 || negative == 4 {
        rate += 0.12;
    } else if positive >= 3 || negative >= 3 {
        rate += 0.08;
    }

    // SAM conviction
    let sam_score = scores.subconscious.abs();
    let sam_confidence = confidences.subconscious;
    if sam_confidence >= 70 && sam_score >= 0.50 {
        rate += 0.10;
    } else if sam_confidence >= 50 && sam_score >= 0.30 {
        rate += 0.05;
    }

    // Regime fit
    if regime.volatility == VolatilityLevel::Extreme && sam_score > 0.40 {
        rate += 0.05;
    } else if regime.regime == MarketRegime::RiskOn && scores.hard_data > 0.30 {
        rate += 0.03;
    }

    // Track record
    if mean_layer_accuracy > 0.65 {
        rate += 0.05;
    } else if mean_layer_accuracy > 0.55 {
        rate += 0.02;
    }

    rate.min(MAX_WIN_RATE)
}
