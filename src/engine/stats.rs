//! Accuracy reporting over resolved predictions

use crate::types::{AccuracyStats, HorizonStats, Prediction, PredictionStatus};
use std::collections::HashMap;

/// Aggregate resolved predictions into hit-rate statistics, grouped by
/// horizon. Pure function; pending predictions are ignored.
pub fn aggregate(resolved: &[Prediction]) -> AccuracyStats {
    let resolved: Vec<&Prediction> = resolved
        .iter()
        .filter(|p| p.status != PredictionStatus::Pending)
        .collect();

    let total = resolved.len();
    let correct = resolved
        .iter()
        .filter(|p| p.status == PredictionStatus::Correct)
        .count();
    let avg_confidence = if total == 0 {
        0.0
    } else {
        resolved.iter().map(|p| p.confidence).sum::<f64>() / total as f64
    };

    let mut by_horizon: HashMap<u32, HorizonStats> = HashMap::new();
    for prediction in &resolved {
        let entry = by_horizon.entry(prediction.horizon_days).or_default();
        entry.total += 1;
        if prediction.status == PredictionStatus::Correct {
            entry.correct += 1;
        }
    }
    for stats in by_horizon.values_mut() {
        stats.accuracy = stats.correct as f64 / stats.total as f64;
    }

    AccuracyStats {
        total,
        correct,
        accuracy: if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        },
        avg_confidence,
        by_horizon,
    }
}
