//! Prediction engine - the public surface of the crate
//!
//! Wires the weight adjustment engine, performance tracker, composer and
//! resolver around the external provider/scorer/store ports.

pub mod composer;
pub mod resolver;
pub mod stats;
pub mod tracker;
pub mod weights;
pub mod winrate;

pub use stats::aggregate;
pub use tracker::PerformanceTracker;
pub use weights::{WeightDecision, WeightEngine};
pub use winrate::estimate_win_rate;

use crate::config::{EngineSettings, WeightConfig};
use crate::error::{EngineError, Result};
use crate::providers::{FeatureProvider, LayerScorer, PredictionStore};
use crate::types::{
    AccuracyStats, Direction, Layer, LayerScoreSet, Prediction, PredictionStatus,
    QuickPrediction, RiskLevel, TradingSession,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Adaptive multi-layer prediction engine.
///
/// One instance per process; cheap to share behind an `Arc`. Prediction
/// generation and outcome resolution may run concurrently; the performance
/// tracker's table guards itself, and resolutions serialize through
/// `resolution_gate`.
pub struct PredictionEngine {
    provider: Arc<dyn FeatureProvider>,
    scorer: Arc<dyn LayerScorer>,
    store: Arc<dyn PredictionStore>,
    tracker: PerformanceTracker,
    weight_engine: WeightEngine,
    settings: EngineSettings,
    /// Serializes the pending check with the save in `record_outcome` so
    /// the sweep and an API caller cannot both resolve the same prediction
    resolution_gate: Mutex<()>,
}

impl PredictionEngine {
    /// Build an engine with default weight bounds and settings
    pub fn new(
        provider: Arc<dyn FeatureProvider>,
        scorer: Arc<dyn LayerScorer>,
        store: Arc<dyn PredictionStore>,
    ) -> Result<Self> {
        Self::with_config(
            provider,
            scorer,
            store,
            WeightConfig::default(),
            EngineSettings::default(),
        )
    }

    /// Build an engine with explicit configuration. Invalid weight bounds
    /// fail here, never on a request path.
    pub fn with_config(
        provider: Arc<dyn FeatureProvider>,
        scorer: Arc<dyn LayerScorer>,
        store: Arc<dyn PredictionStore>,
        weight_config: WeightConfig,
        settings: EngineSettings,
    ) -> Result<Self> {
        Ok(Self {
            provider,
            scorer,
            store,
            tracker: PerformanceTracker::new(),
            weight_engine: WeightEngine::new(weight_config)?,
            settings,
            resolution_gate: Mutex::new(()),
        })
    }

    pub fn tracker(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn weight_engine(&self) -> &WeightEngine {
        &self.weight_engine
    }

    /// Generate and persist a pending prediction for a symbol.
    ///
    /// Upstream failures propagate; the caller decides whether to degrade.
    pub async fn generate_prediction(
        &self,
        symbol: &str,
        horizon_days: u32,
        current_price: Option<Decimal>,
    ) -> Result<Prediction> {
        let now = Utc::now();
        let snapshot = self
            .provider
            .snapshot(symbol, now)
            .await
            .map_err(|e| upstream(symbol, horizon_days, e))?;
        let scored = self
            .scorer
            .score(&snapshot)
            .map_err(|e| upstream(symbol, horizon_days, e))?;

        // Snapshot the shared table outside any lock the composer holds
        let performance = self.tracker.snapshot().await;
        let decision = self.weight_engine.compute_weights(
            &scored.confidences,
            &scored.regime,
            Some(&scored.scores),
            &performance,
        );
        if !decision.adjustments.is_empty() {
            debug!(
                "Weight adjustments for {}: {:?}",
                symbol, decision.adjustments
            );
        }

        let prediction = composer::compose(
            symbol,
            horizon_days,
            current_price,
            self.settings.fallback_price,
            &snapshot,
            &scored,
            decision,
            now,
        );
        self.store.save(&prediction).await?;

        info!(
            "Prediction {} | {} {}d | {} p={:.2} conf={:.0} risk={}",
            prediction.id,
            symbol,
            horizon_days,
            direction_word(prediction.direction),
            prediction.probability,
            prediction.confidence,
            risk_word(prediction.risk_level),
        );
        Ok(prediction)
    }

    /// One-line forecast that never fails outward: internal errors degrade
    /// to a neutral, zero-confidence summary.
    pub async fn quick_predict(&self, symbol: &str, horizon_days: u32) -> QuickPrediction {
        match self.generate_prediction(symbol, horizon_days, None).await {
            Ok(prediction) => QuickPrediction {
                direction: prediction.direction,
                confidence: prediction.confidence,
                summary: format!(
                    "{}: {} over {}d ({:.0}% probability, {} risk)",
                    symbol,
                    direction_word(prediction.direction),
                    horizon_days,
                    prediction.probability * 100.0,
                    risk_word(prediction.risk_level),
                ),
            },
            Err(e) => {
                warn!("Quick predict degraded for {} ({}d): {}", symbol, horizon_days, e);
                QuickPrediction {
                    direction: Direction::Neutral,
                    confidence: 0.0,
                    summary: format!(
                        "Prediction unavailable for {} ({}d): {}",
                        symbol, horizon_days, e
                    ),
                }
            }
        }
    }

    /// Resolve a pending prediction against the realized price.
    ///
    /// Terminal and idempotent: a second call for the same id returns
    /// `AlreadyResolved` and the tracker is never double-counted. The
    /// outcome is credited to every layer equally.
    pub async fn record_outcome(&self, id: Uuid, actual_price: Decimal) -> Result<Prediction> {
        // Held through the save and the tracker updates: the pending check
        // below is only sound if no other resolution runs in between
        let _gate = self.resolution_gate.lock().await;

        let mut prediction = self
            .store
            .get(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        if prediction.status != PredictionStatus::Pending {
            return Err(EngineError::AlreadyResolved(id));
        }

        let correct = resolver::resolve(&mut prediction, actual_price);
        self.store.save(&prediction).await?;

        let regime = prediction.layer_breakdown.regime.regime;
        for layer in Layer::ALL {
            self.tracker.record_outcome(layer, correct, regime).await;
        }

        info!(
            "Prediction {} resolved {} | {} {}d",
            id,
            if correct { "correct" } else { "incorrect" },
            prediction.symbol,
            prediction.horizon_days,
        );
        Ok(prediction)
    }

    /// Resolve every pending prediction past its target date.
    ///
    /// Per-prediction failures are logged and skipped so one bad symbol
    /// never stalls the sweep. Safe to run concurrently with generation.
    pub async fn resolve_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.list_pending(now).await?;
        let mut resolved = 0;
        for prediction in due {
            let price = match self
                .provider
                .snapshot(&prediction.symbol, prediction.target_date)
                .await
            {
                Ok(snapshot) => snapshot.current_price,
                Err(e) => {
                    warn!(
                        "Sweep: snapshot unavailable for {} ({}d): {}",
                        prediction.symbol, prediction.horizon_days, e
                    );
                    continue;
                }
            };
            let Some(price) = price else {
                warn!(
                    "Sweep: no price for {} at target date; skipping",
                    prediction.symbol
                );
                continue;
            };
            match self.record_outcome(prediction.id, price).await {
                Ok(_) => resolved += 1,
                // A concurrent resolution got there first
                Err(EngineError::AlreadyResolved(_)) => {}
                Err(e) => warn!("Sweep: failed to resolve {}: {}", prediction.id, e),
            }
        }
        Ok(resolved)
    }

    /// Periodic resolution sweep. Runs until the task is dropped.
    pub async fn run_sweeper(&self) {
        let period = std::time::Duration::from_secs(self.settings.sweep_interval_secs);
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match self.resolve_due(Utc::now()).await {
                Ok(0) => {}
                Ok(n) => info!("Resolution sweep resolved {} predictions", n),
                Err(e) => error!("Resolution sweep failed: {}", e),
            }
        }
    }

    /// Hit-rate statistics over resolved predictions, optionally filtered
    /// by symbol. Recomputed on demand; no cached state.
    pub async fn accuracy_stats(&self, symbol: Option<&str>) -> Result<AccuracyStats> {
        let resolved = self.store.list_resolved(symbol).await?;
        Ok(stats::aggregate(&resolved))
    }

    /// Expected accuracy for a setup in the given session, using the
    /// tracker's current mean accuracy.
    pub async fn estimate_win_rate(
        &self,
        session: TradingSession,
        scored: &LayerScoreSet,
    ) -> f64 {
        let mean = self.tracker.mean_accuracy().await;
        winrate::estimate_win_rate(
            session,
            &scored.scores,
            &scored.confidences,
            &scored.regime,
            mean,
        )
    }
}

fn upstream(symbol: &str, horizon_days: u32, source: anyhow::Error) -> EngineError {
    EngineError::Upstream {
        symbol: symbol.to_string(),
        horizon_days,
        reason: source.to_string(),
    }
}

fn direction_word(direction: Direction) -> &'static str {
    match direction {
        Direction::Up => "up",
        Direction::Down => "down",
        Direction::Neutral => "neutral",
    }
}

fn risk_word(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
    }
}
