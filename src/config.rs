//! Engine configuration: weight bounds and runtime settings

use crate::error::{EngineError, Result};
use crate::types::{Layer, WeightSet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default and bounded weight configuration for the four layers.
///
/// Bounds are soft design targets: weights are clamped to them before the
/// final renormalization, which can push a weight slightly outside its
/// nominal range in extreme cases. The Subconscious ceiling (0.45) is
/// deliberately the highest so that layer can dominate on a strong signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    pub defaults: WeightSet,
    pub min_bounds: WeightSet,
    pub max_bounds: WeightSet,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            defaults: WeightSet {
                hard_data: 0.30,
                technical: 0.25,
                subconscious: 0.25,
                economic: 0.20,
            },
            min_bounds: WeightSet {
                hard_data: 0.20,
                technical: 0.15,
                subconscious: 0.15,
                economic: 0.10,
            },
            max_bounds: WeightSet {
                hard_data: 0.40,
                technical: 0.35,
                subconscious: 0.45,
                economic: 0.25,
            },
        }
    }
}

impl WeightConfig {
    /// Validate bounds at startup. Request paths assume a valid config.
    pub fn validate(&self) -> Result<()> {
        for layer in Layer::ALL {
            let min = *self.min_bounds.get(layer);
            let max = *self.max_bounds.get(layer);
            let def = *self.defaults.get(layer);

            if !(min.is_finite() && max.is_finite() && def.is_finite()) {
                return Err(EngineError::Configuration(format!(
                    "non-finite weight bound for {}",
                    layer.display_name()
                )));
            }
            if min < 0.0 || max > 1.0 || min > max {
                return Err(EngineError::Configuration(format!(
                    "invalid bounds [{min}, {max}] for {}",
                    layer.display_name()
                )));
            }
            if def < min || def > max {
                return Err(EngineError::Configuration(format!(
                    "default weight {def} outside [{min}, {max}] for {}",
                    layer.display_name()
                )));
            }
        }

        // A weight set summing to 1.0 must be reachable inside the bounds
        if self.min_bounds.sum() > 1.0 || self.max_bounds.sum() < 1.0 {
            return Err(EngineError::Configuration(format!(
                "bounds cannot contain a normalized weight set (min sum {:.2}, max sum {:.2})",
                self.min_bounds.sum(),
                self.max_bounds.sum()
            )));
        }

        Ok(())
    }
}

/// Runtime knobs read from the environment, with documented defaults
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Price assumed when the caller and snapshot supply none. Targets
    /// derived from it are uncalibrated.
    pub fallback_price: Decimal,
    /// How often the resolution sweep runs
    pub sweep_interval_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            fallback_price: Decimal::from(100),
            sweep_interval_secs: 300,
        }
    }
}

impl EngineSettings {
    /// Load settings from environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fallback_price: std::env::var("ENGINE_FALLBACK_PRICE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fallback_price),
            sweep_interval_secs: std::env::var("ENGINE_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }
}
