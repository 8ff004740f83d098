//! Units in transit between tiles.

use std::collections::VecDeque;

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};

use super::{FactionId, UnitId, UnitKind};

/// Lifecycle of a transit unit.
///
/// `Idle → Moving → (Arrived | Intercepted | Cancelled)`. An interception
/// whose survivors keep marching returns the unit to `Moving`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementState {
    /// Created but not yet given a path.
    #[default]
    Idle,
    /// Advancing along its path.
    Moving,
    /// Reached the end of its path.
    Arrived,
    /// Stopped by a foreign presence before the end of its path.
    Intercepted,
    /// Stopped by an explicit cancel or halt.
    Cancelled,
}

/// Units detached from a stack or garrison and moving along a path.
///
/// `current_tile` is the last tile the unit fully entered; `progress` runs
/// from 0 to 1 toward the front of `path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Owning faction.
    pub faction: FactionId,
    /// Number of units carried.
    pub count: u32,
    /// Unit type.
    pub kind: UnitKind,
    /// Veterancy level.
    pub level: u8,
    /// Remaining tiles, next hop first.
    pub path: VecDeque<TileCoord>,
    /// Tile currently occupied.
    pub current_tile: TileCoord,
    /// Fraction of the current hop completed.
    pub progress: f64,
    /// Base speed multiplier.
    pub speed: f64,
    /// Lifecycle state.
    pub state: MovementState,
}

impl TransitUnit {
    /// Creates an idle transit unit standing on `origin`.
    #[must_use]
    pub fn new(id: UnitId, faction: FactionId, origin: TileCoord, count: u32, speed: f64) -> Self {
        Self {
            id,
            faction,
            count,
            kind: UnitKind::default(),
            level: 0,
            path: VecDeque::new(),
            current_tile: origin,
            progress: 0.0,
            speed,
            state: MovementState::Idle,
        }
    }

    /// Sets the unit type, builder style.
    #[must_use]
    pub fn with_kind(mut self, kind: UnitKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the veterancy level, builder style.
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    /// Tile the unit is heading into.
    #[must_use]
    pub fn next_tile(&self) -> Option<TileCoord> {
        self.path.front().copied()
    }

    /// Final tile of the remaining path.
    #[must_use]
    pub fn destination(&self) -> Option<TileCoord> {
        self.path.back().copied()
    }

    /// Returns `true` while the unit is advancing.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.state == MovementState::Moving
    }

    /// Returns `true` if the next hop is the last one.
    #[must_use]
    pub fn on_final_hop(&self) -> bool {
        self.path.len() == 1
    }
}
