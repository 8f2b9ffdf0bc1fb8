//! Outcome resolver
//!
//! Terminal transition of the prediction state machine: pending -> correct
//! or incorrect, once the realized price at the target date is known.

use crate::types::{Direction, Outcome, Prediction, PredictionStatus};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Realized moves inside this band count as neutral, percent
const NEUTRAL_BAND_PCT: f64 = 0.1;

/// Attach the realized outcome and flip the status.
///
/// Callers must check the prediction is still pending; this only does the
/// math and the mutation.
pub(crate) fn resolve(prediction: &mut Prediction, actual_price: Decimal) -> bool {
    let actual_return = realized_return_pct(prediction.price_at_prediction, actual_price);
    let actual_direction = if actual_return > NEUTRAL_BAND_PCT {
        Direction::Up
    } else if actual_return < -NEUTRAL_BAND_PCT {
        Direction::Down
    } else {
        Direction::Neutral
    };

    let correct = prediction.direction == actual_direction;
    prediction.status = if correct {
        PredictionStatus::Correct
    } else {
        PredictionStatus::Incorrect
    };
    prediction.outcome = Some(Outcome {
        actual_direction,
        actual_return,
        price_at_target: actual_price,
        prediction_correct: correct,
        error_percent: (prediction.expected_return - actual_return).abs(),
    });
    correct
}

/// Percent move from entry to target, 0 when the entry price is unusable
fn realized_return_pct(entry: Decimal, target: Decimal) -> f64 {
    if entry <= Decimal::ZERO {
        return 0.0;
    }
    ((target - entry) / entry * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}
