//! Tile occupancy index and collision detection.
//!
//! The [`TileOccupancyTracker`] is the authoritative record of which units
//! stand on which tile. It indexes stationary stacks and transit units by
//! [`UnitId`] and castle garrisons by tile, and buffers an ENTER or EXIT
//! [`TransitionEvent`] for every change.
//!
//! # Collisions
//!
//! A tile is contested when its stationary holders (stacks and the castle
//! garrison) belong to more than one faction, or when an arriving transit
//! unit meets a holder of another faction. Transit units merely passing
//! through never collide with each other.
//!
//! # Invariant
//!
//! A unit is indexed under at most one tile. `track` on an already tracked
//! unit behaves like `update`, so the invariant holds whatever order callers
//! use.
//!
//! # Note on `HashMap` Usage
//!
//! The per-unit reverse index is a `HashMap` because it is only ever queried
//! by known id. Everything iterated (tiles, unit sets, garrisons) is
//! `BTreeMap`/`BTreeSet` ordered.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::entity::{FactionId, UnitId};
use crate::event::{SimTime, TransitionEvent, TransitionKind};

/// Whether an indexed unit holds its tile or is passing through.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccupantKind {
    /// A stationary stack.
    Stationary,
    /// A transit unit.
    Transit,
}

/// Index entry of one unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    /// Tile the unit is indexed under.
    pub tile: TileCoord,
    /// Faction of the unit.
    pub faction: FactionId,
    /// Stationary or in transit.
    pub kind: OccupantKind,
}

/// Factions and units sharing a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    /// Contested tile.
    pub tile: TileCoord,
    /// Every faction holding or entering the tile, garrison owner included.
    pub factions: BTreeSet<FactionId>,
    /// Stationary units on the tile, plus the arriving unit if there was one.
    pub units: BTreeSet<UnitId>,
    /// Owner of the castle garrison on the tile, if any.
    pub garrison: Option<FactionId>,
}

/// Registry of tile occupants.
///
/// # Example
///
/// ```
/// use bastion_core::entity::{FactionId, UnitId};
/// use bastion_core::occupancy::{OccupantKind, TileOccupancyTracker};
/// use bastion_grid::TileCoord;
///
/// let mut tracker = TileOccupancyTracker::new();
/// let tile = TileCoord::new(2, 2);
/// tracker.track(UnitId::new(1), FactionId::new(0), tile, OccupantKind::Stationary);
/// tracker.track(UnitId::new(2), FactionId::new(1), tile, OccupantKind::Transit);
/// assert!(tracker.detect_collision(tile).is_none());
///
/// let collision = tracker.detect_arrival(tile, UnitId::new(2)).unwrap();
/// assert_eq!(collision.factions.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TileOccupancyTracker {
    tiles: BTreeMap<TileCoord, BTreeSet<UnitId>>,
    units: HashMap<UnitId, Occupant>,
    garrisons: BTreeMap<TileCoord, FactionId>,
    pending: Vec<TransitionEvent>,
    now: SimTime,
}

impl TileOccupancyTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timestamp stamped on subsequent transitions.
    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Registers a unit on `tile` and emits ENTER.
    ///
    /// A unit that is already tracked is moved instead, as by [`update`](Self::update).
    pub fn track(&mut self, unit: UnitId, faction: FactionId, tile: TileCoord, kind: OccupantKind) {
        if self.units.contains_key(&unit) {
            self.set_kind(unit, kind);
            self.update(unit, tile);
            return;
        }
        self.units.insert(unit, Occupant { tile, faction, kind });
        self.tiles.entry(tile).or_default().insert(unit);
        self.emit(unit, faction, tile, TransitionKind::Enter);
    }

    /// Moves a tracked unit to `tile`.
    ///
    /// Emits EXIT for the old tile and ENTER for the new one when the tile
    /// changed. Returns `true` if it did.
    pub fn update(&mut self, unit: UnitId, tile: TileCoord) -> bool {
        let Some(occupant) = self.units.get(&unit).copied() else {
            return false;
        };
        if occupant.tile == tile {
            return false;
        }
        self.detach(unit, occupant.tile);
        self.emit(unit, occupant.faction, occupant.tile, TransitionKind::Exit);

        self.units.insert(unit, Occupant { tile, ..occupant });
        self.tiles.entry(tile).or_default().insert(unit);
        self.emit(unit, occupant.faction, tile, TransitionKind::Enter);
        true
    }

    /// Records that a unit now holds its tile or has set off. Emits nothing.
    pub fn set_kind(&mut self, unit: UnitId, kind: OccupantKind) {
        if let Some(occupant) = self.units.get_mut(&unit) {
            occupant.kind = kind;
        }
    }

    /// Deregisters a unit and emits EXIT. Returns the tile it was on.
    pub fn remove(&mut self, unit: UnitId) -> Option<TileCoord> {
        let occupant = self.units.remove(&unit)?;
        self.detach(unit, occupant.tile);
        self.emit(unit, occupant.faction, occupant.tile, TransitionKind::Exit);
        Some(occupant.tile)
    }

    fn detach(&mut self, unit: UnitId, tile: TileCoord) {
        if let Some(set) = self.tiles.get_mut(&tile) {
            set.remove(&unit);
            if set.is_empty() {
                self.tiles.remove(&tile);
            }
        }
    }

    fn emit(&mut self, unit: UnitId, faction: FactionId, tile: TileCoord, kind: TransitionKind) {
        trace!(%unit, %faction, %tile, ?kind, "occupancy transition");
        self.pending.push(TransitionEvent {
            unit,
            faction,
            tile,
            kind,
            time: self.now,
        });
    }

    /// Records the owner of the castle garrison on `tile`.
    pub fn set_garrison(&mut self, tile: TileCoord, owner: FactionId) {
        self.garrisons.insert(tile, owner);
    }

    /// Owner of the garrison on `tile`, if a castle stands there.
    #[must_use]
    pub fn garrison_at(&self, tile: TileCoord) -> Option<FactionId> {
        self.garrisons.get(&tile).copied()
    }

    /// Units indexed on `tile`, in id order.
    pub fn units_on_tile(&self, tile: TileCoord) -> impl Iterator<Item = UnitId> + '_ {
        self.tiles.get(&tile).into_iter().flatten().copied()
    }

    /// Tile a unit is indexed under.
    #[must_use]
    pub fn tile_of(&self, unit: UnitId) -> Option<TileCoord> {
        self.units.get(&unit).map(|occupant| occupant.tile)
    }

    /// Faction of a tracked unit.
    #[must_use]
    pub fn faction_of(&self, unit: UnitId) -> Option<FactionId> {
        self.units.get(&unit).map(|occupant| occupant.faction)
    }

    /// Index entry of a tracked unit.
    #[must_use]
    pub fn occupant(&self, unit: UnitId) -> Option<Occupant> {
        self.units.get(&unit).copied()
    }

    /// Returns `true` if the unit is indexed.
    #[must_use]
    pub fn is_tracked(&self, unit: UnitId) -> bool {
        self.units.contains_key(&unit)
    }

    /// Number of indexed units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if no unit is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Every tracked unit with its entry, in id order.
    #[must_use]
    pub fn occupants(&self) -> BTreeMap<UnitId, Occupant> {
        self.units.iter().map(|(&id, &occupant)| (id, occupant)).collect()
    }

    /// Factions present on `tile` in any form, garrison owner included.
    #[must_use]
    pub fn factions_on_tile(&self, tile: TileCoord) -> BTreeSet<FactionId> {
        let mut factions: BTreeSet<FactionId> = self
            .units_on_tile(tile)
            .filter_map(|unit| self.faction_of(unit))
            .collect();
        factions.extend(self.garrison_at(tile));
        factions
    }

    /// Stationary units on `tile`, in id order.
    pub fn holders_on_tile(&self, tile: TileCoord) -> impl Iterator<Item = UnitId> + '_ {
        self.units_on_tile(tile)
            .filter(|unit| self.units.get(unit).is_some_and(|o| o.kind == OccupantKind::Stationary))
    }

    /// Reports a collision when the stationary holders of `tile` belong to
    /// two or more factions.
    #[must_use]
    pub fn detect_collision(&self, tile: TileCoord) -> Option<Collision> {
        self.collision(tile, None)
    }

    /// Reports a collision between `unit`, which has just entered `tile`,
    /// and the tile's holders.
    ///
    /// Returns `None` if the unit is not indexed on `tile`.
    #[must_use]
    pub fn detect_arrival(&self, tile: TileCoord, unit: UnitId) -> Option<Collision> {
        let occupant = self.units.get(&unit).filter(|o| o.tile == tile)?;
        self.collision(tile, Some((unit, occupant.faction)))
    }

    fn collision(&self, tile: TileCoord, arrival: Option<(UnitId, FactionId)>) -> Option<Collision> {
        let mut units: BTreeSet<UnitId> = self.holders_on_tile(tile).collect();
        let mut factions: BTreeSet<FactionId> =
            units.iter().filter_map(|&unit| self.faction_of(unit)).collect();
        factions.extend(self.garrison_at(tile));
        if let Some((unit, faction)) = arrival {
            units.insert(unit);
            factions.insert(faction);
        }
        if factions.len() < 2 {
            return None;
        }
        Some(Collision {
            tile,
            factions,
            units,
            garrison: self.garrison_at(tile),
        })
    }

    /// Drains buffered transitions in emission order.
    pub fn take_events(&mut self) -> Vec<TransitionEvent> {
        std::mem::take(&mut self.pending)
    }
}
