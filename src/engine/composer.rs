//! Prediction composer
//!
//! Folds weighted layer scores into a directional call with probability,
//! confidence, risk level, expected return and price target, and explains
//! the call with key factors read off the raw snapshot.

use crate::engine::weights::WeightDecision;
use crate::types::{
    Direction, FeatureSnapshot, KeyFactors, Layer, LayerBreakdown, LayerScoreSet, LayerSet,
    MarketRegime, Prediction, PredictionStatus, RiskLevel, VolatilityLevel,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Composite score past this calls a direction; at or below it stays neutral
const DIRECTION_THRESHOLD: f64 = 0.15;

pub(crate) fn compose(
    symbol: &str,
    horizon_days: u32,
    current_price: Option<Decimal>,
    fallback_price: Decimal,
    snapshot: &FeatureSnapshot,
    scored: &LayerScoreSet,
    decision: WeightDecision,
    now: DateTime<Utc>,
) -> Prediction {
    let scores = &scored.scores;
    let weights = decision.weights;

    let composite: f64 = Layer::ALL
        .iter()
        .map(|&l| scores.get(l) * weights.get(l))
        .sum();

    let (direction, probability) = direction_and_probability(composite);
    let confidence = calibrated_confidence(scores);
    let risk_level = risk_level(snapshot, scored.regime.volatility, confidence);
    let expected_return = expected_return(snapshot.vix, horizon_days, probability, direction);

    let price = current_price
        .or(snapshot.current_price)
        .unwrap_or(fallback_price);
    let multiplier =
        Decimal::from_f64_retain(1.0 + expected_return / 100.0).unwrap_or(Decimal::ONE);
    let price_target = price * multiplier;

    Prediction {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        prediction_date: now,
        horizon_days,
        target_date: now + Duration::days(horizon_days as i64),
        direction,
        probability,
        expected_return,
        price_target,
        price_at_prediction: price,
        confidence,
        risk_level,
        layer_breakdown: LayerBreakdown {
            scores: *scores,
            weights,
            confidences: scored.confidences,
            regime: scored.regime,
        },
        key_factors: key_factors(snapshot, &scored.regime.regime),
        status: PredictionStatus::Pending,
        outcome: None,
    }
}

/// Strict comparison at the threshold: exactly +-0.15 stays neutral
fn direction_and_probability(composite: f64) -> (Direction, f64) {
    if composite > DIRECTION_THRESHOLD {
        (Direction::Up, 0.5 + (composite * 0.5).min(0.45))
    } else if composite < -DIRECTION_THRESHOLD {
        (Direction::Down, 0.5 + (composite.abs() * 0.5).min(0.45))
    } else {
        (Direction::Neutral, 0.5)
    }
}

/// Average score magnitude scaled to [0, 50], plus a consensus bonus,
/// clamped to [10, 95]
fn calibrated_confidence(scores: &LayerSet<f64>) -> f64 {
    let avg_magnitude: f64 =
        Layer::ALL.iter().map(|&l| scores.get(l).abs()).sum::<f64>() / Layer::ALL.len() as f64;
    let mut confidence = avg_magnitude * 50.0;

    let positive = scores.iter().filter(|(_, &s)| s > 0.0).count();
    let negative = scores.iter().filter(|(_, &s)| s < 0.0).count();
    if positive == 4 || negative == 4 {
        confidence += 25.0;
    } else if positive >= 3 || negative >= 3 {
        confidence += 10.0;
    }

    confidence.clamp(10.0, 95.0)
}

/// Additive risk score: >=4 high, >=2 medium, else low
fn risk_level(
    snapshot: &FeatureSnapshot,
    volatility: VolatilityLevel,
    confidence: f64,
) -> RiskLevel {
    let mut risk = 0u32;

    // Volatility tiers are exclusive; extreme already implies elevated
    if volatility == VolatilityLevel::Extreme {
        risk += 2;
    } else if snapshot.vix > 20.0 {
        risk += 1;
    }
    if snapshot.liquidity_void {
        risk += 1;
    }
    if snapshot.sentiment_dissonance > 0.5 {
        risk += 1;
    }
    if confidence < 50.0 {
        risk += 1;
    }
    if snapshot.yield_curve_spread < 0.0 {
        risk += 1;
    }

    match risk {
        r if r >= 4 => RiskLevel::High,
        r if r >= 2 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Expected move over the horizon: VIX/16 approximates the daily move,
/// scaled by sqrt(horizon) and how far probability sits from a coin flip
fn expected_return(vix: f64, horizon_days: u32, probability: f64, direction: Direction) -> f64 {
    if direction == Direction::Neutral {
        return 0.0;
    }
    let base_move = (vix / 16.0) * (horizon_days as f64).sqrt();
    let magnitude = base_move * (probability - 0.5) * 2.0;
    match direction {
        Direction::Up => magnitude,
        Direction::Down => -magnitude,
        Direction::Neutral => 0.0,
    }
}

/// Deterministic explanation rules over the raw snapshot.
///
/// Every matching rule contributes a line; nothing picks a "strongest"
/// factor.
fn key_factors(snapshot: &FeatureSnapshot, regime: &MarketRegime) -> KeyFactors {
    let mut factors = KeyFactors::default();

    if snapshot.momentum_pct > 5.0 {
        factors
            .bullish
            .push(format!("Strong momentum: +{:.1}% over lookback", snapshot.momentum_pct));
    } else if snapshot.momentum_pct < -5.0 {
        factors
            .bearish
            .push(format!("Weak momentum: {:.1}% over lookback", snapshot.momentum_pct));
    }

    if snapshot.options_skew > 0.15 {
        factors
            .bullish
            .push("Options flow skewed toward calls".to_string());
    } else if snapshot.options_skew < -0.15 {
        factors
            .bearish
            .push("Options flow skewed toward puts".to_string());
    }

    if snapshot.dark_pool_flow > 0.3 {
        factors
            .bullish
            .push("Dark pool prints show net accumulation".to_string());
    } else if snapshot.dark_pool_flow < -0.3 {
        factors
            .bearish
            .push("Dark pool prints show net distribution".to_string());
    }

    if snapshot.insider_net_buys > 0 {
        factors
            .bullish
            .push(format!("Net insider buying ({} filings)", snapshot.insider_net_buys));
    } else if snapshot.insider_net_buys < 0 {
        factors
            .bearish
            .push(format!("Net insider selling ({} filings)", -snapshot.insider_net_buys));
    }

    if snapshot.legislator_net_buys > 0 {
        factors
            .bullish
            .push("Congressional trading disclosures lean long".to_string());
    } else if snapshot.legislator_net_buys < 0 {
        factors
            .bearish
            .push("Congressional trading disclosures lean short".to_string());
    }

    if snapshot.rsi < 30.0 {
        factors
            .bullish
            .push(format!("RSI oversold at {:.0}", snapshot.rsi));
    } else if snapshot.rsi > 70.0 {
        factors
            .bearish
            .push(format!("RSI overbought at {:.0}", snapshot.rsi));
    }

    if snapshot.structure_shift {
        factors
            .uncertain
            .push("Market structure shift in progress".to_string());
    }
    if snapshot.liquidity_void {
        factors
            .uncertain
            .push("Liquidity void near current price".to_string());
    }

    if snapshot.sentiment_score > 0.6 {
        factors
            .bullish
            .push("Crowd sentiment strongly positive".to_string());
    } else if snapshot.sentiment_score < -0.6 {
        factors
            .bearish
            .push("Crowd sentiment strongly negative".to_string());
    }
    if snapshot.sentiment_dissonance > 0.5 {
        factors
            .uncertain
            .push("Sentiment sources disagree with each other".to_string());
    }

    if snapshot.vix >= 30.0 {
        factors
            .uncertain
            .push(format!("Volatility elevated (VIX {:.0})", snapshot.vix));
    }
    if snapshot.yield_curve_spread < 0.0 {
        factors.bearish.push("Yield curve inverted".to_string());
    }
    if snapshot.consumer_sentiment < 70.0 {
        factors
            .bearish
            .push("Consumer sentiment depressed".to_string());
    }

    match regime {
        MarketRegime::RiskOn => factors.bullish.push("Risk-on regime".to_string()),
        MarketRegime::RiskOff => factors.bearish.push("Risk-off regime".to_string()),
        MarketRegime::Contraction => {
            factors.bearish.push("Macro regime contracting".to_string())
        }
        MarketRegime::Expansion => factors.bullish.push("Macro regime expanding".to_string()),
        MarketRegime::Neutral => {}
    }

    factors
}
