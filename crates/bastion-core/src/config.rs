//! Externally supplied simulation constants.
//!
//! The core consumes configuration but never loads it; `SimConfig` round-trips
//! through any serde format so callers can keep it wherever they like.

use std::collections::BTreeMap;

use bastion_grid::{SearchBudget, TerrainModel};
use serde::{Deserialize, Serialize};

use crate::entity::{UnitKind, DEFAULT_GARRISON_CAPACITY};
use crate::error::ConfigError;

/// Time to cross one neutral tile at speed 1.0, in milliseconds.
pub const DEFAULT_TIME_PER_TILE_MS: f64 = 1000.0;

/// Simulation constants.
///
/// # Example
///
/// ```
/// use bastion_core::config::SimConfig;
/// use bastion_core::entity::UnitKind;
///
/// let config = SimConfig::default().with_speed(UnitKind::Infantry, 10.0);
/// assert!(config.validate().is_ok());
/// assert!((config.speed_for(UnitKind::Infantry) - 10.0).abs() < f64::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Base time to cross one tile, in milliseconds.
    pub base_time_per_tile_ms: f64,
    /// Budget for each path search.
    pub search_budget: SearchBudget,
    /// Base movement speed per unit type.
    pub unit_speeds: BTreeMap<UnitKind, f64>,
    /// Terrain lookup table installed into the grid.
    pub terrain: TerrainModel,
    /// Capacity given to castles added without one.
    pub default_garrison_capacity: u32,
}

impl SimConfig {
    /// Overrides the speed of one unit type, builder style.
    #[must_use]
    pub fn with_speed(mut self, kind: UnitKind, speed: f64) -> Self {
        self.unit_speeds.insert(kind, speed);
        self
    }

    /// Overrides the base time per tile, builder style.
    #[must_use]
    pub fn with_time_per_tile(mut self, millis: f64) -> Self {
        self.base_time_per_tile_ms = millis;
        self
    }

    /// Overrides the path search budget, builder style.
    #[must_use]
    pub fn with_search_budget(mut self, budget: SearchBudget) -> Self {
        self.search_budget = budget;
        self
    }

    /// Overrides the terrain table, builder style.
    #[must_use]
    pub fn with_terrain(mut self, terrain: TerrainModel) -> Self {
        self.terrain = terrain;
        self
    }

    /// Base speed of a unit type. Missing entries default to 1.0.
    #[must_use]
    pub fn speed_for(&self, kind: UnitKind) -> f64 {
        self.unit_speeds.get(&kind).copied().unwrap_or(1.0)
    }

    /// Checks that every constant is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid constant found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_time_per_tile_ms.is_finite() && self.base_time_per_tile_ms > 0.0) {
            return Err(ConfigError::NonPositiveTileTime(self.base_time_per_tile_ms));
        }
        for (kind, &speed) in &self.unit_speeds {
            if !(speed.is_finite() && speed > 0.0) {
                return Err(ConfigError::NonPositiveSpeed {
                    kind: format!("{kind:?}"),
                    speed,
                });
            }
        }
        if self.search_budget.max_duration.is_zero() || self.search_budget.max_expansions == Some(0) {
            return Err(ConfigError::ZeroSearchBudget);
        }
        Ok(())
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_time_per_tile_ms: DEFAULT_TIME_PER_TILE_MS,
            search_budget: SearchBudget::default(),
            unit_speeds: BTreeMap::from([
                (UnitKind::Infantry, 1.0),
                (UnitKind::Cavalry, 2.0),
                (UnitKind::Siege, 0.5),
            ]),
            terrain: TerrainModel::default(),
            default_garrison_capacity: DEFAULT_GARRISON_CAPACITY,
        }
    }
}
