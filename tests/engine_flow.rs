//! End-to-end prediction flow against mocked provider and scorer

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use prediction_engine::{
    Direction, EngineError, FeatureProvider, FeatureSnapshot, Layer, LayerScoreSet, LayerScorer,
    LayerSet, MemoryPredictionStore, Prediction, PredictionEngine, PredictionStatus,
    PredictionStore, RegimeInfo,
};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Mock feature provider with a configurable snapshot and failure switch
struct MockProvider {
    snapshot: RwLock<FeatureSnapshot>,
    fail: AtomicBool,
}

impl MockProvider {
    fn new(snapshot: FeatureSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            fail: AtomicBool::new(false),
        }
    }

    fn set_price(&self, price: Decimal) {
        self.snapshot.write().unwrap().current_price = Some(price);
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeatureProvider for MockProvider {
    async fn snapshot(
        &self,
        symbol: &str,
        _date: DateTime<Utc>,
    ) -> anyhow::Result<FeatureSnapshot> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("market data feed offline");
        }
        let mut snapshot = self.snapshot.read().unwrap().clone();
        snapshot.symbol = symbol.to_string();
        Ok(snapshot)
    }
}

/// Mock scorer returning a fixed score set
struct MockScorer {
    scored: RwLock<LayerScoreSet>,
}

impl MockScorer {
    fn new(scored: LayerScoreSet) -> Self {
        Self {
            scored: RwLock::new(scored),
        }
    }
}

impl LayerScorer for MockScorer {
    fn score(&self, _snapshot: &FeatureSnapshot) -> anyhow::Result<LayerScoreSet> {
        Ok(self.scored.read().unwrap().clone())
    }
}

fn calm_snapshot(price: i64) -> FeatureSnapshot {
    FeatureSnapshot {
        symbol: String::new(),
        as_of: Utc::now(),
        current_price: Some(Decimal::from(price)),
        momentum_pct: 6.5,
        options_skew: 0.2,
        dark_pool_flow: 0.1,
        insider_net_buys: 2,
        legislator_net_buys: 0,
        rsi: 55.0,
        structure_shift: false,
        liquidity_void: false,
        sentiment_score: 0.4,
        sentiment_dissonance: 0.2,
        vix: 18.0,
        yield_curve_spread: 0.6,
        consumer_sentiment: 92.0,
    }
}

fn bullish_scores() -> LayerScoreSet {
    LayerScoreSet {
        scores: LayerSet {
            hard_data: 0.6,
            technical: 0.5,
            subconscious: 0.7,
            economic: 0.4,
        },
        confidences: LayerSet {
            hard_data: 80,
            technical: 70,
            subconscious: 85,
            economic: 60,
        },
        regime: RegimeInfo::default(),
    }
}

struct Harness {
    provider: Arc<MockProvider>,
    engine: PredictionEngine,
    store: MemoryPredictionStore,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let provider = Arc::new(MockProvider::new(calm_snapshot(200)));
    let scorer = Arc::new(MockScorer::new(bullish_scores()));
    let store = MemoryPredictionStore::new();
    let engine = PredictionEngine::new(
        provider.clone(),
        scorer,
        Arc::new(store.clone()),
    )
    .unwrap();
    Harness {
        provider,
        engine,
        store,
    }
}

#[tokio::test]
async fn test_generate_resolve_and_feedback() {
    let h = harness();

    let prediction = h
        .engine
        .generate_prediction("AAPL", 5, None)
        .await
        .unwrap();
    assert_eq!(prediction.direction, Direction::Up);
    assert!(prediction.probability > 0.5 && prediction.probability <= 0.95);
    assert_eq!(prediction.status, PredictionStatus::Pending);
    assert!((prediction.layer_breakdown.weights.sum() - 1.0).abs() < 1e-9);
    assert!(!prediction.key_factors.bullish.is_empty());
    assert_eq!(h.store.len().await, 1);

    // Price rallied: the up call resolves correct
    let resolved = h
        .engine
        .record_outcome(prediction.id, Decimal::from(210))
        .await
        .unwrap();
    assert_eq!(resolved.status, PredictionStatus::Correct);
    let outcome = resolved.outcome.unwrap();
    assert_eq!(outcome.actual_direction, Direction::Up);
    assert!(outcome.prediction_correct);

    // Every layer was credited once
    for layer in Layer::ALL {
        let record = h.engine.tracker().get_record(layer).await.unwrap();
        assert_eq!(record.sample_size, 1);
        assert_eq!(record.recent_accuracy, 1.0);
    }
}

#[tokio::test]
async fn test_resolution_is_idempotent() {
    let h = harness();
    let prediction = h
        .engine
        .generate_prediction("MSFT", 3, None)
        .await
        .unwrap();

    h.engine
        .record_outcome(prediction.id, Decimal::from(220))
        .await
        .unwrap();
    let second = h
        .engine
        .record_outcome(prediction.id, Decimal::from(220))
        .await;
    assert!(matches!(second, Err(EngineError::AlreadyResolved(_))));

    // Tracker counted the outcome exactly once
    let record = h.engine.tracker().get_record(Layer::HardData).await.unwrap();
    assert_eq!(record.sample_size, 1);
}

/// Store wrapper whose `get` parks at an await point, like any
/// database-backed store would
struct SlowStore {
    inner: MemoryPredictionStore,
}

#[async_trait]
impl PredictionStore for SlowStore {
    async fn save(&self, prediction: &Prediction) -> prediction_engine::Result<()> {
        self.inner.save(prediction).await
    }

    async fn get(&self, id: Uuid) -> prediction_engine::Result<Option<Prediction>> {
        tokio::task::yield_now().await;
        self.inner.get(id).await
    }

    async fn list_pending(
        &self,
        now: DateTime<Utc>,
    ) -> prediction_engine::Result<Vec<Prediction>> {
        self.inner.list_pending(now).await
    }

    async fn list_by_symbol(
        &self,
        symbol: &str,
        limit: usize,
    ) -> prediction_engine::Result<Vec<Prediction>> {
        self.inner.list_by_symbol(symbol, limit).await
    }

    async fn list_resolved(
        &self,
        symbol: Option<&str>,
    ) -> prediction_engine::Result<Vec<Prediction>> {
        self.inner.list_resolved(symbol).await
    }
}

#[tokio::test]
async fn test_concurrent_resolutions_credit_tracker_once() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let provider = Arc::new(MockProvider::new(calm_snapshot(200)));
    let scorer = Arc::new(MockScorer::new(bullish_scores()));
    let store = SlowStore {
        inner: MemoryPredictionStore::new(),
    };
    let engine =
        PredictionEngine::new(provider, scorer, Arc::new(store)).unwrap();

    let prediction = engine.generate_prediction("AAPL", 1, None).await.unwrap();

    // The sweep and an API caller race to resolve the same prediction;
    // exactly one may win
    let price = Decimal::from(210);
    let (a, b) = tokio::join!(
        engine.record_outcome(prediction.id, price),
        engine.record_outcome(prediction.id, price),
    );
    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in [a, b] {
        if let Err(e) = result {
            assert!(matches!(e, EngineError::AlreadyResolved(_)));
        }
    }

    // The loser was rejected before touching the tracker
    for layer in Layer::ALL {
        let record = engine.tracker().get_record(layer).await.unwrap();
        assert_eq!(record.sample_size, 1);
    }
}

#[tokio::test]
async fn test_unknown_prediction_id() {
    let h = harness();
    let missing = h
        .engine
        .record_outcome(Uuid::new_v4(), Decimal::from(100))
        .await;
    assert!(matches!(missing, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn test_generate_propagates_upstream_failure() {
    let h = harness();
    h.provider.set_failing(true);

    let err = h
        .engine
        .generate_prediction("TSLA", 10, None)
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("TSLA"));
    assert!(message.contains("10d"));
}

#[tokio::test]
async fn test_quick_predict_never_fails() {
    let h = harness();

    let ok = h.engine.quick_predict("AAPL", 5).await;
    assert_eq!(ok.direction, Direction::Up);
    assert!(ok.summary.contains("AAPL"));

    h.provider.set_failing(true);
    let degraded = h.engine.quick_predict("AAPL", 5).await;
    assert_eq!(degraded.direction, Direction::Neutral);
    assert_eq!(degraded.confidence, 0.0);
    assert!(degraded.summary.contains("AAPL"));
}

#[tokio::test]
async fn test_sweep_resolves_past_due_only() {
    let h = harness();
    let short = h
        .engine
        .generate_prediction("NVDA", 1, None)
        .await
        .unwrap();
    let long = h
        .engine
        .generate_prediction("NVDA", 10, None)
        .await
        .unwrap();

    // Two days out: only the 1d horizon is due
    h.provider.set_price(Decimal::from(215));
    let resolved = h
        .engine
        .resolve_due(Utc::now() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(resolved, 1);

    let short_after = h.store.get(short.id).await.unwrap().unwrap();
    assert_ne!(short_after.status, PredictionStatus::Pending);
    let long_after = h.store.get(long.id).await.unwrap().unwrap();
    assert_eq!(long_after.status, PredictionStatus::Pending);
}

#[tokio::test]
async fn test_sweep_skips_failing_symbols() {
    let h = harness();
    h.engine.generate_prediction("AMD", 1, None).await.unwrap();

    h.provider.set_failing(true);
    let resolved = h
        .engine
        .resolve_due(Utc::now() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(resolved, 0);

    // Still pending; a later sweep can pick it up
    h.provider.set_failing(false);
    let resolved = h
        .engine
        .resolve_due(Utc::now() + Duration::days(2))
        .await
        .unwrap();
    assert_eq!(resolved, 1);
}

#[tokio::test]
async fn test_accuracy_stats_filter_and_grouping() {
    let h = harness();

    let a = h.engine.generate_prediction("AAPL", 1, None).await.unwrap();
    let b = h.engine.generate_prediction("AAPL", 5, None).await.unwrap();
    let c = h.engine.generate_prediction("MSFT", 5, None).await.unwrap();

    h.engine.record_outcome(a.id, Decimal::from(210)).await.unwrap(); // up, correct
    h.engine.record_outcome(b.id, Decimal::from(150)).await.unwrap(); // down, incorrect
    h.engine.record_outcome(c.id, Decimal::from(230)).await.unwrap(); // up, correct

    let all = h.engine.accuracy_stats(None).await.unwrap();
    assert_eq!(all.total, 3);
    assert_eq!(all.correct, 2);
    assert_eq!(all.by_horizon[&5].total, 2);

    let aapl = h.engine.accuracy_stats(Some("AAPL")).await.unwrap();
    assert_eq!(aapl.total, 2);
    assert_eq!(aapl.correct, 1);
}

#[tokio::test]
async fn test_track_record_eventually_moves_weights() {
    let h = harness();

    // Ten correct resolutions season every layer past the sample floor
    for _ in 0..10 {
        let p = h.engine.generate_prediction("AAPL", 1, None).await.unwrap();
        h.engine.record_outcome(p.id, Decimal::from(250)).await.unwrap();
    }
    for layer in Layer::ALL {
        let record = h.engine.tracker().get_record(layer).await.unwrap();
        assert_eq!(record.sample_size, 10);
        assert_eq!(record.recent_accuracy, 1.0);
    }

    let scored = bullish_scores();
    let performance = h.engine.tracker().snapshot().await;
    let decision = h.engine.weight_engine().compute_weights(
        &scored.confidences,
        &scored.regime,
        Some(&scored.scores),
        &performance,
    );
    assert!(decision
        .adjustments
        .iter()
        .any(|a| a.contains("recent accuracy")));
    assert!((decision.weights.sum() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_win_rate_uses_tracker_mean() {
    let h = harness();
    let scored = bullish_scores();

    let before = h
        .engine
        .estimate_win_rate(prediction_engine::TradingSession::UsOpen, &scored)
        .await;

    for _ in 0..10 {
        let p = h.engine.generate_prediction("AAPL", 1, None).await.unwrap();
        h.engine.record_outcome(p.id, Decimal::from(250)).await.unwrap();
    }
    let after = h
        .engine
        .estimate_win_rate(prediction_engine::TradingSession::UsOpen, &scored)
        .await;

    // Mean accuracy moved from the 0.55 default to 1.0: bonus tier upgrade
    assert!(after > before);
    assert!(after <= 0.95);
}
