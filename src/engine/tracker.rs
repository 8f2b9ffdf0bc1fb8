//! Performance tracker - rolling per-layer accuracy, the feedback half of
//! the self-improving weight loop

use crate::types::{Layer, LayerPerformanceRecord, LayerSet, MarketRegime};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Weight on history in the exponential rolling average
const DECAY: f64 = 0.95;
/// Sample counter cap; accuracy keeps decaying past it
const SAMPLE_CAP: u32 = 100;
/// Layers with fewer samples than this don't contribute to the mean
const MEAN_MIN_SAMPLES: u32 = 5;
/// Assumed accuracy before any layer is seasoned
const DEFAULT_MEAN_ACCURACY: f64 = 0.55;

/// Shared per-layer accuracy table.
///
/// One table per engine, injected into both weight computation (reads) and
/// outcome resolution (writes). Cloning the handle shares the table.
#[derive(Clone)]
pub struct PerformanceTracker {
    inner: Arc<RwLock<LayerSet<Option<LayerPerformanceRecord>>>>,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(LayerSet::uniform(None))),
        }
    }

    /// Fold one resolved prediction into a layer's rolling accuracy.
    ///
    /// First outcome for a layer creates its record at 1.0 or 0.0; later
    /// outcomes decay history at 0.95 per sample.
    pub async fn record_outcome(&self, layer: Layer, was_correct: bool, regime: MarketRegime) {
        let hit = if was_correct { 1.0 } else { 0.0 };
        let mut table = self.inner.write().await;
        let slot = table.get_mut(layer);
        match slot {
            Some(record) => {
                record.sample_size = (record.sample_size + 1).min(SAMPLE_CAP);
                record.recent_accuracy = record.recent_accuracy * DECAY + hit * (1.0 - DECAY);
                record.regime = regime;
                record.last_updated = Utc::now();
            }
            None => {
                *slot = Some(LayerPerformanceRecord {
                    recent_accuracy: hit,
                    sample_size: 1,
                    regime,
                    last_updated: Utc::now(),
                });
            }
        }
        debug!(layer = ?layer, was_correct, "layer performance updated");
    }

    pub async fn get_record(&self, layer: Layer) -> Option<LayerPerformanceRecord> {
        self.inner.read().await.get(layer).clone()
    }

    /// Clone the whole table under one read lock, so weight computation
    /// sees a consistent view without holding the lock.
    pub async fn snapshot(&self) -> LayerSet<Option<LayerPerformanceRecord>> {
        self.inner.read().await.clone()
    }

    /// Mean accuracy across seasoned layers, 0.55 until any layer has
    /// at least 5 samples.
    pub async fn mean_accuracy(&self) -> f64 {
        let table = self.inner.read().await;
        let seasoned: Vec<f64> = table
            .iter()
            .filter_map(|(_, slot)| seasoned_accuracy(slot))
            .collect();
        if seasoned.is_empty() {
            DEFAULT_MEAN_ACCURACY
        } else {
            seasoned.iter().sum::<f64>() / seasoned.len() as f64
        }
    }
}

fn seasoned_accuracy(slot: &Option<LayerPerformanceRecord>) -> Option<f64> {
    slot.as_ref()
        .filter(|r| r.sample_size >= MEAN_MIN_SAMPLES)
        .map(|r| r.recent_accuracy)
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}
