//! Ports for external collaborators, plus the in-memory store.
//!
//! The engine composes predictions from whatever implements these traits;
//! production wiring (market data APIs, a real database) lives outside
//! this crate.

use crate::error::Result;
use crate::types::{FeatureSnapshot, LayerScoreSet, Prediction, PredictionStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Source of raw indicator snapshots
#[async_trait]
pub trait FeatureProvider: Send + Sync {
    /// Fetch raw indicators for a symbol as of a date
    async fn snapshot(&self, symbol: &str, date: DateTime<Utc>) -> anyhow::Result<FeatureSnapshot>;
}

/// Reduces a raw snapshot to one normalized score per layer plus a regime tag
pub trait LayerScorer: Send + Sync {
    fn score(&self, snapshot: &FeatureSnapshot) -> anyhow::Result<LayerScoreSet>;
}

/// Durable storage for predictions
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Insert or update a prediction
    async fn save(&self, prediction: &Prediction) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Prediction>>;

    /// Pending predictions whose target date has passed as of `now`
    async fn list_pending(&self, now: DateTime<Utc>) -> Result<Vec<Prediction>>;

    /// Most recent predictions for a symbol, newest first
    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<Prediction>>;

    /// Resolved predictions, optionally filtered by symbol
    async fn list_resolved(&self, symbol: Option<&str>) -> Result<Vec<Prediction>>;
}

/// In-memory store used in tests and single-process embeddings
#[derive(Clone, Default)]
pub struct MemoryPredictionStore {
    inner: Arc<RwLock<HashMap<Uuid, Prediction>>>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn save(&self, prediction: &Prediction) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(prediction.id, prediction.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Prediction>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn list_pending(&self, now: DateTime<Utc>) -> Result<Vec<Prediction>> {
        let map = self.inner.read().await;
        let mut due: Vec<Prediction> = map
            .values()
            .filter(|p| p.status == PredictionStatus::Pending && p.target_date <= now)
            .cloned()
            .collect();
        due.sort_by_key(|p| p.target_date);
        Ok(due)
    }

    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<Prediction>> {
        let map = self.inner.read().await;
        let mut matches: Vec<Prediction> = map
            .values()
            .filter(|p| p.symbol == symbol)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.prediction_date.cmp(&a.prediction_date));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn list_resolved(&self, symbol: Option<&str>) -> Result<Vec<Prediction>> {
        let map = self.inner.read().await;
        let mut resolved: Vec<Prediction> = map
            .values()
            .filter(|p| p.status != PredictionStatus::Pending)
            .filter(|p| symbol.map_or(true, |s| p.symbol == s))
            .cloned()
            .collect();
        resolved.sort_by_key(|p| p.prediction_date);
        Ok(resolved)
    }
}
