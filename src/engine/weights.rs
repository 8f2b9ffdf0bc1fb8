//! Weight adjustment engine
//!
//! Turns per-layer confidence, market regime, inter-layer agreement and the
//! historical track record into the fractional weight each layer gets in a
//! prediction. Adjustments are additive and applied in a fixed order, then
//! weights are clamped to their bounds and renormalized to sum 1.0.

use crate::config::WeightConfig;
use crate::error::Result;
use crate::types::{
    Layer, LayerConfidence, LayerPerformanceRecord, LayerSet, MarketRegime, RegimeInfo,
    TrendDirection, VolatilityLevel, WeightSet,
};

/// Weights for one prediction plus the trace of rules that fired
#[derive(Debug, Clone)]
pub struct WeightDecision {
    pub weights: WeightSet,
    /// Human-readable audit trail, one entry per rule that fired
    pub adjustments: Vec<String>,
}

/// Confidence ladder: first row whose floor the confidence reaches wins
const CONFIDENCE_STEPS: [(u8, f64); 5] = [
    (80, 0.10),
    (60, 0.05),
    (40, 0.0),
    (20, -0.03),
    (0, -0.05),
];

/// Performance ladder, evaluated top-down on layers with >= 10 samples.
/// `true` rows fire when accuracy is above the threshold, `false` rows
/// when below.
const PERFORMANCE_STEPS: [(bool, f64, f64); 4] = [
    (true, 0.70, 0.05),
    (true, 0.60, 0.02),
    (false, 0.45, -0.05),
    (false, 0.50, -0.02),
];

/// Samples a layer needs before its track record moves its weight
const PERFORMANCE_MIN_SAMPLES: u32 = 10;

struct RegimeRule {
    note: &'static str,
    applies: fn(&RegimeInfo) -> bool,
    deltas: &'static [(Layer, f64)],
}

/// Regime rules accumulate: any number of them can fire on one input
const REGIME_RULES: [RegimeRule; 5] = [
    RegimeRule {
        note: "Extreme volatility regime: boosted SAM weight",
        applies: |r| r.volatility == VolatilityLevel::Extreme,
        deltas: &[
            (Layer::Subconscious, 0.10),
            (Layer::HardData, 0.05),
            (Layer::Technical, -0.05),
            (Layer::Economic, -0.05),
        ],
    },
    RegimeRule {
        note: "High volatility regime: boosted SAM weight",
        applies: |r| r.volatility == VolatilityLevel::High,
        deltas: &[(Layer::Subconscious, 0.05), (Layer::HardData, 0.03)],
    },
    RegimeRule {
        note: "Risk-off regime: boosted economic weight",
        applies: |r| r.regime == MarketRegime::RiskOff,
        deltas: &[(Layer::Economic, 0.05), (Layer::Technical, -0.03)],
    },
    RegimeRule {
        note: "Trending market: boosted technical weight",
        applies: |r| {
            matches!(r.trend, TrendDirection::Bullish | TrendDirection::Bearish)
        },
        deltas: &[(Layer::Technical, 0.05)],
    },
    RegimeRule {
        note: "Economic contraction: boosted economic and hard data weight",
        applies: |r| r.regime == MarketRegime::Contraction,
        deltas: &[(Layer::Economic, 0.05), (Layer::HardData, 0.03)],
    },
];

/// Computes layer weights. Stateless: identical inputs (including the
/// performance snapshot) produce identical output.
pub struct WeightEngine {
    config: WeightConfig,
}

impl WeightEngine {
    /// Build the engine, rejecting invalid bounds up front
    pub fn new(config: WeightConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WeightConfig {
        &self.config
    }

    /// Compute the weight set for one prediction.
    ///
    /// Order: defaults, confidence ladder, regime rules, agreement rules
    /// (only when raw scores are supplied), performance ladder, clamp to
    /// bounds, renormalize. Renormalization happens after clamping, so a
    /// weight can drift slightly outside its nominal bound; the bounds are
    /// soft targets.
    pub fn compute_weights(
        &self,
        confidences: &LayerConfidence,
        regime: &RegimeInfo,
        scores: Option<&LayerSet<f64>>,
        performance: &LayerSet<Option<LayerPerformanceRecord>>,
    ) -> WeightDecision {
        let mut weights = self.config.defaults;
        let mut adjustments = Vec::new();

        self.apply_confidence(&mut weights, &mut adjustments, confidences);
        self.apply_regime(&mut weights, &mut adjustments, regime);
        if let Some(scores) = scores {
            self.apply_agreement(&mut weights, &mut adjustments, scores);
        }
        self.apply_performance(&mut weights, &mut adjustments, performance);

        let weights = self.clamp_and_normalize(weights);
        WeightDecision {
            weights,
            adjustments,
        }
    }

    fn apply_confidence(
        &self,
        weights: &mut WeightSet,
        adjustments: &mut Vec<String>,
        confidences: &LayerConfidence,
    ) {
        for layer in Layer::ALL {
            let confidence = *confidences.get(layer);
            let delta = CONFIDENCE_STEPS
                .iter()
                .find(|(floor, _)| confidence >= *floor)
                .map(|(_, delta)| *delta)
                .unwrap_or(0.0);
            if delta != 0.0 {
                *weights.get_mut(layer) += delta;
                adjustments.push(format!(
                    "{} confidence {}: weight {:+.2}",
                    layer.display_name(),
                    confidence,
                    delta
                ));
            }
        }
    }

    fn apply_regime(
        &self,
        weights: &mut WeightSet,
        adjustments: &mut Vec<String>,
        regime: &RegimeInfo,
    ) {
        for rule in &REGIME_RULES {
            if (rule.applies)(regime) {
                for &(layer, delta) in rule.deltas {
                    *weights.get_mut(layer) += delta;
                }
                adjustments.push(rule.note.to_string());
            }
        }
    }

    fn apply_agreement(
        &self,
        weights: &mut WeightSet,
        adjustments: &mut Vec<String>,
        scores: &LayerSet<f64>,
    ) {
        let sam = scores.subconscious;
        let hard = scores.hard_data;

        if sam != 0.0 && hard != 0.0 {
            if (sam > 0.0) == (hard > 0.0) {
                weights.subconscious += 0.08;
                weights.hard_data += 0.03;
                adjustments.push("SAM confirms hard data: boosted SAM weight".to_string());
            } else {
                weights.subconscious -= 0.03;
                weights.hard_data += 0.03;
                adjustments.push("SAM diverges from hard data: reduced SAM weight".to_string());
            }
        }

        let all_positive = Layer::ALL.iter().all(|&l| *scores.get(l) > 0.0);
        let all_negative = Layer::ALL.iter().all(|&l| *scores.get(l) < 0.0);
        if all_positive || all_negative {
            for layer in Layer::ALL {
                *weights.get_mut(layer) += 0.02;
            }
            adjustments.push("All four layers agree: consensus bonus".to_string());
        }
    }

    fn apply_performance(
        &self,
        weights: &mut WeightSet,
        adjustments: &mut Vec<String>,
        performance: &LayerSet<Option<LayerPerformanceRecord>>,
    ) {
        for layer in Layer::ALL {
            let record = match performance.get(layer) {
                Some(r) if r.sample_size >= PERFORMANCE_MIN_SAMPLES => r,
                // Too few samples to trust; leave the weight alone
                _ => continue,
            };
            let accuracy = record.recent_accuracy;
            let delta = PERFORMANCE_STEPS
                .iter()
                .find(|(above, threshold, _)| {
                    if *above {
                        accuracy > *threshold
                    } else {
                        accuracy < *threshold
                    }
                })
                .map(|(_, _, delta)| *delta);
            if let Some(delta) = delta {
                *weights.get_mut(layer) += delta;
                adjustments.push(format!(
                    "{} recent accuracy {:.0}%: weight {:+.2}",
                    layer.display_name(),
                    accuracy * 100.0,
                    delta
                ));
            }
        }
    }

    fn clamp_to_bounds(&self, weights: WeightSet) -> WeightSet {
        weights.map(|layer, &w| {
            w.clamp(
                *self.config.min_bounds.get(layer),
                *self.config.max_bounds.get(layer),
            )
        })
    }

    fn clamp_and_normalize(&self, weights: WeightSet) -> WeightSet {
        let clamped = self.clamp_to_bounds(weights);

        let total = clamped.sum();
        if total <= 0.0 || !total.is_finite() {
            // Degenerate input; fall back to the defaults rather than NaN
            return self.config.defaults;
        }
        clamped.map(|_, &w| w / total)
    }
}
