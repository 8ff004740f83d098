//! Owned simulation state.
//!
//! The [`World`] is the container for everything the tactical core mutates:
//! - The terrain grid snapshot
//! - Stationary stacks, castles and transit units, with deterministic
//!   iteration order (`BTreeMap`)
//! - The [`TileOccupancyTracker`] index over all of them
//! - Per-tile spell queues
//! - The [`EventLog`] surfaced to external systems
//!
//! # Occupancy Synchronisation
//!
//! Every mutator that adds, moves or removes a unit updates the occupancy
//! index in the same call and flushes its transition events into the log, so
//! the index always mirrors the union of stacks and transit units. Public
//! editing goes through [`World::place_stack`], [`World::add_castle`] and
//! friends; the movement scheduler and combat resolver use crate-private
//! mutators with the same guarantee.
//!
//! # Example
//!
//! ```
//! use bastion_core::entity::{Castle, FactionId, UnitKind};
//! use bastion_core::world::World;
//! use bastion_grid::{TerrainGrid, TerrainKind, TileCoord};
//!
//! let grid = TerrainGrid::filled(8, 8, TerrainKind::Grassland).unwrap();
//! let mut world = World::new(grid);
//!
//! let red = FactionId::new(0);
//! let tile = TileCoord::new(1, 1);
//! let first = world.place_stack(red, tile, 10, UnitKind::Infantry).unwrap();
//! let second = world.place_stack(red, tile, 5, UnitKind::Infantry).unwrap();
//!
//! // Same-faction stacks on one tile merge
//! assert_eq!(first, second);
//! assert_eq!(world.stack(first).unwrap().count, 15);
//!
//! world.add_castle(Castle::new(TileCoord::new(6, 6), FactionId::new(1), 20)).unwrap();
//! assert_eq!(world.faction_total(FactionId::new(1)), 20);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use bastion_grid::{GridError, TerrainGrid, TerrainKind, TileCoord};
use tracing::debug;

use crate::entity::{Castle, FactionId, MoveSource, TransitUnit, UnitId, UnitKind, UnitStack};
use crate::error::{MoveError, PlacementError, StateError};
use crate::event::{EventLog, SimEvent, SimTime};
use crate::occupancy::{OccupantKind, TileOccupancyTracker};
use crate::spell::SpellEffect;

/// Units available at a move source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct SourceInfo {
    pub(crate) faction: FactionId,
    pub(crate) available: u32,
    pub(crate) kind: UnitKind,
    pub(crate) level: u8,
}

/// Simulation state container.
#[derive(Debug, Clone)]
pub struct World {
    grid: TerrainGrid,
    /// Monotonically increasing unit id counter.
    next_id: u64,
    stacks: BTreeMap<UnitId, UnitStack>,
    castles: BTreeMap<TileCoord, Castle>,
    transits: BTreeMap<UnitId, TransitUnit>,
    occupancy: TileOccupancyTracker,
    spells: BTreeMap<TileCoord, Vec<SpellEffect>>,
    events: EventLog,
    /// Factions already reported as eliminated.
    eliminated: BTreeSet<FactionId>,
    time: SimTime,
}

impl World {
    /// Creates an empty world over `grid`.
    #[must_use]
    pub fn new(grid: TerrainGrid) -> Self {
        Self {
            grid,
            next_id: 0,
            stacks: BTreeMap::new(),
            castles: BTreeMap::new(),
            transits: BTreeMap::new(),
            occupancy: TileOccupancyTracker::new(),
            spells: BTreeMap::new(),
            events: EventLog::new(),
            eliminated: BTreeSet::new(),
            time: SimTime::default(),
        }
    }

    // -------------------------------------------------------------------------
    // Grid
    // -------------------------------------------------------------------------

    /// The terrain grid.
    #[must_use]
    pub fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// Changes the terrain of one tile.
    ///
    /// Transit units re-read live terrain every tick, so the change affects
    /// units already on the move.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::OutOfBounds`] for tiles outside the grid.
    pub fn set_terrain(&mut self, tile: TileCoord, terrain: TerrainKind) -> Result<(), PlacementError> {
        self.grid.set_terrain(tile, terrain).map_err(|err| match err {
            GridError::OutOfBounds(coord) => PlacementError::OutOfBounds(coord),
            _ => PlacementError::OutOfBounds(tile),
        })
    }

    fn check_bounds(&self, tile: TileCoord) -> Result<(), PlacementError> {
        if self.grid.in_bounds(tile) {
            Ok(())
        } else {
            Err(PlacementError::OutOfBounds(tile))
        }
    }

    // -------------------------------------------------------------------------
    // Time and Events
    // -------------------------------------------------------------------------

    /// Current simulated time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub(crate) fn set_time(&mut self, time: SimTime) {
        self.time = time;
        self.occupancy.set_time(time);
    }

    /// Recorded events not yet drained.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Drains recorded events in emission order.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        self.flush_transitions();
        self.events.take_events()
    }

    pub(crate) fn push_event(&mut self, event: SimEvent) {
        self.flush_transitions();
        self.events.push(event);
    }

    /// Moves buffered occupancy transitions into the event log.
    fn flush_transitions(&mut self) {
        let transitions = self.occupancy.take_events();
        self.events.extend(transitions.into_iter().map(SimEvent::Transition));
    }

    fn allocate_id(&mut self) -> UnitId {
        let id = UnitId::new(self.next_id);
        self.next_id += 1;
        id
    }

    // -------------------------------------------------------------------------
    // Stacks
    // -------------------------------------------------------------------------

    /// Places units of `faction` on `tile`.
    ///
    /// Merges into the faction's existing stack on the tile when there is one,
    /// keeping that stack's type. Placement never triggers combat; call
    /// `Simulation::resolve_tile` afterwards to settle a contested tile.
    ///
    /// # Errors
    ///
    /// Rejects tiles outside the grid and empty stacks.
    pub fn place_stack(
        &mut self,
        faction: FactionId,
        tile: TileCoord,
        count: u32,
        kind: UnitKind,
    ) -> Result<UnitId, PlacementError> {
        self.check_bounds(tile)?;
        if count == 0 {
            return Err(PlacementError::EmptyStack);
        }
        if let Some(id) = self.stack_at(tile, faction).map(|stack| stack.id) {
            if let Some(stack) = self.stacks.get_mut(&id) {
                stack.count = stack.count.saturating_add(count);
            }
            debug!(%id, %faction, %tile, count, "merged placement into stack");
            return Ok(id);
        }
        let id = self.allocate_id();
        self.stacks
            .insert(id, UnitStack::new(id, faction, tile, count).with_kind(kind));
        self.occupancy.track(id, faction, tile, OccupantKind::Stationary);
        self.flush_transitions();
        debug!(%id, %faction, %tile, count, "placed stack");
        Ok(id)
    }

    /// Returns a stack by id.
    #[must_use]
    pub fn stack(&self, id: UnitId) -> Option<&UnitStack> {
        self.stacks.get(&id)
    }

    /// Iterates over stacks in id order.
    pub fn stacks(&self) -> impl Iterator<Item = &UnitStack> + '_ {
        self.stacks.values()
    }

    /// Stacks standing on `tile`, in id order.
    #[must_use]
    pub fn stacks_on_tile(&self, tile: TileCoord) -> Vec<&UnitStack> {
        self.occupancy
            .units_on_tile(tile)
            .filter_map(|id| self.stacks.get(&id))
            .collect()
    }

    /// The stack of `faction` on `tile`, if any.
    #[must_use]
    pub fn stack_at(&self, tile: TileCoord, faction: FactionId) -> Option<&UnitStack> {
        self.stacks_on_tile(tile)
            .into_iter()
            .find(|stack| stack.faction == faction)
    }

    pub(crate) fn remove_stack(&mut self, id: UnitId) -> Option<UnitStack> {
        let stack = self.stacks.remove(&id)?;
        self.occupancy.remove(id);
        self.flush_transitions();
        Some(stack)
    }

    /// Sets a stack's count, removing the stack at zero.
    pub(crate) fn set_stack_count(&mut self, id: UnitId, count: u32) {
        if count == 0 {
            self.remove_stack(id);
        } else if let Some(stack) = self.stacks.get_mut(&id) {
            stack.count = count;
        }
    }

    // -------------------------------------------------------------------------
    // Castles
    // -------------------------------------------------------------------------

    /// Adds a castle and marks its tile as a valid siege target.
    ///
    /// # Errors
    ///
    /// Rejects tiles outside the grid and tiles that already hold a castle.
    pub fn add_castle(&mut self, castle: Castle) -> Result<(), PlacementError> {
        let tile = castle.tile;
        self.check_bounds(tile)?;
        if self.castles.contains_key(&tile) {
            return Err(PlacementError::CastleExists(tile));
        }
        self.grid
            .mark_siege_target(tile)
            .map_err(|_| PlacementError::OutOfBounds(tile))?;
        self.occupancy.set_garrison(tile, castle.owner);
        debug!(%tile, owner = %castle.owner, garrison = castle.garrison, "added castle");
        self.castles.insert(tile, castle);
        Ok(())
    }

    /// Returns the castle on `tile`.
    #[must_use]
    pub fn castle(&self, tile: TileCoord) -> Option<&Castle> {
        self.castles.get(&tile)
    }

    /// Iterates over castles in tile order.
    pub fn castles(&self) -> impl Iterator<Item = &Castle> + '_ {
        self.castles.values()
    }

    /// Changes a garrison by `delta` units, clamping at zero.
    ///
    /// This is the hook for external production and siege attrition. Returns
    /// the new garrison.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::NoCastle`] when no castle stands on `tile`.
    pub fn adjust_garrison(&mut self, tile: TileCoord, delta: i64) -> Result<u32, PlacementError> {
        let castle = self
            .castles
            .get_mut(&tile)
            .ok_or(PlacementError::NoCastle(tile))?;
        let adjusted = (i64::from(castle.garrison) + delta).max(0);
        castle.garrison = u32::try_from(adjusted).unwrap_or(u32::MAX);
        debug!(%tile, delta, garrison = castle.garrison, "adjusted garrison");
        Ok(castle.garrison)
    }

    /// Installs a new owner and garrison on the castle at `tile`.
    pub(crate) fn set_castle(&mut self, tile: TileCoord, owner: FactionId, garrison: u32) {
        if let Some(castle) = self.castles.get_mut(&tile) {
            castle.owner = owner;
            castle.garrison = garrison;
            self.occupancy.set_garrison(tile, owner);
        }
    }

    // -------------------------------------------------------------------------
    // Transit Units
    // -------------------------------------------------------------------------

    /// Returns a transit unit by id.
    #[must_use]
    pub fn transit(&self, id: UnitId) -> Option<&TransitUnit> {
        self.transits.get(&id)
    }

    /// Iterates over transit units in id order.
    pub fn transits(&self) -> impl Iterator<Item = &TransitUnit> + '_ {
        self.transits.values()
    }

    /// Ids of transit units currently moving, in id order.
    #[must_use]
    pub fn moving_transits(&self) -> Vec<UnitId> {
        self.transits
            .values()
            .filter(|transit| transit.is_moving())
            .map(|transit| transit.id)
            .collect()
    }

    pub(crate) fn transit_mut(&mut self, id: UnitId) -> Option<&mut TransitUnit> {
        self.transits.get_mut(&id)
    }

    /// Reports the units available at a move source located on `from`.
    pub(crate) fn source_info(&self, source: MoveSource, from: TileCoord) -> Result<SourceInfo, MoveError> {
        let unknown = MoveError::UnknownSource {
            requested: source,
            from,
        };
        match source {
            MoveSource::Stack(id) => {
                let stack = self.stacks.get(&id).filter(|s| s.tile == from).ok_or(unknown)?;
                Ok(SourceInfo {
                    faction: stack.faction,
                    available: stack.count,
                    kind: stack.kind,
                    level: stack.level,
                })
            }
            MoveSource::Garrison(tile) => {
                let castle = self.castles.get(&tile).filter(|c| c.tile == from).ok_or(unknown)?;
                Ok(SourceInfo {
                    faction: castle.owner,
                    available: castle.garrison,
                    kind: UnitKind::default(),
                    level: 0,
                })
            }
        }
    }

    /// Detaches `count` units from a source and spawns an idle transit unit
    /// on `from` carrying them.
    ///
    /// The units leave the source immediately so they are never counted
    /// twice.
    pub(crate) fn spawn_transit(
        &mut self,
        source: MoveSource,
        from: TileCoord,
        count: u32,
        speed: f64,
    ) -> Result<UnitId, MoveError> {
        let info = self.source_info(source, from)?;
        if info.available < count {
            return Err(MoveError::InsufficientUnits {
                requested: count,
                available: info.available,
            });
        }
        match source {
            MoveSource::Stack(id) => self.set_stack_count(id, info.available - count),
            MoveSource::Garrison(tile) => {
                if let Some(castle) = self.castles.get_mut(&tile) {
                    castle.garrison -= count;
                }
            }
        }

        let id = self.allocate_id();
        let transit = TransitUnit::new(id, info.faction, from, count, speed)
            .with_kind(info.kind)
            .with_level(info.level);
        self.transits.insert(id, transit);
        self.occupancy.track(id, info.faction, from, OccupantKind::Transit);
        self.flush_transitions();
        Ok(id)
    }

    /// Advances a transit unit onto the next tile of its path.
    ///
    /// Returns the tile entered.
    pub(crate) fn hop_transit(&mut self, id: UnitId) -> Option<TileCoord> {
        let transit = self.transits.get_mut(&id)?;
        let next = transit.path.pop_front()?;
        transit.current_tile = next;
        transit.progress = 0.0;
        self.occupancy.update(id, next);
        self.flush_transitions();
        Some(next)
    }

    pub(crate) fn remove_transit(&mut self, id: UnitId) -> Option<TransitUnit> {
        let transit = self.transits.remove(&id)?;
        self.occupancy.remove(id);
        self.flush_transitions();
        Some(transit)
    }

    /// Turns a transit unit into a stationary stack on its current tile.
    ///
    /// The stack keeps the transit's id, so only its occupant kind changes in
    /// the index.
    pub(crate) fn settle_transit(&mut self, id: UnitId, count: u32) -> Option<UnitId> {
        if count == 0 {
            self.remove_transit(id);
            return None;
        }
        let transit = self.transits.remove(&id)?;
        let stack = UnitStack::new(id, transit.faction, transit.current_tile, count)
            .with_kind(transit.kind)
            .with_level(transit.level);
        self.stacks.insert(id, stack);
        self.occupancy.set_kind(id, OccupantKind::Stationary);
        Some(id)
    }

    // -------------------------------------------------------------------------
    // Spells
    // -------------------------------------------------------------------------

    /// Queues a spell for the next contested resolution on `tile`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::OutOfBounds`] for tiles outside the grid.
    pub fn queue_spell(&mut self, tile: TileCoord, spell: SpellEffect) -> Result<(), PlacementError> {
        self.check_bounds(tile)?;
        self.spells.entry(tile).or_default().push(spell);
        Ok(())
    }

    /// Spells waiting on `tile`, in queue order.
    #[must_use]
    pub fn pending_spells(&self, tile: TileCoord) -> &[SpellEffect] {
        self.spells.get(&tile).map(Vec::as_slice).unwrap_or_default()
    }

    pub(crate) fn take_spells(&mut self, tile: TileCoord) -> Vec<SpellEffect> {
        self.spells.remove(&tile).unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// The occupancy index.
    #[must_use]
    pub fn occupancy(&self) -> &TileOccupancyTracker {
        &self.occupancy
    }

    /// Every faction that owns a stack, transit unit or castle.
    #[must_use]
    pub fn factions(&self) -> BTreeSet<FactionId> {
        self.stacks
            .values()
            .map(|stack| stack.faction)
            .chain(self.transits.values().map(|transit| transit.faction))
            .chain(self.castles.values().map(|castle| castle.owner))
            .collect()
    }

    /// Global unit total of a faction: stacks, transit units and garrisons.
    #[must_use]
    pub fn faction_total(&self, faction: FactionId) -> u64 {
        let stacks: u64 = self
            .stacks
            .values()
            .filter(|stack| stack.faction == faction)
            .map(|stack| u64::from(stack.count))
            .sum();
        let transits: u64 = self
            .transits
            .values()
            .filter(|transit| transit.faction == faction)
            .map(|transit| u64::from(transit.count))
            .sum();
        let garrisons: u64 = self
            .castles
            .values()
            .filter(|castle| castle.owner == faction)
            .map(|castle| u64::from(castle.garrison))
            .sum();
        stacks + transits + garrisons
    }

    /// Units per faction on `tile`, counting stacks, transit units and the
    /// garrison.
    #[must_use]
    pub fn strength_on_tile(&self, tile: TileCoord) -> BTreeMap<FactionId, u64> {
        let mut strength = BTreeMap::new();
        for id in self.occupancy.units_on_tile(tile) {
            let entry = if let Some(stack) = self.stacks.get(&id) {
                Some((stack.faction, stack.count))
            } else {
                self.transits.get(&id).map(|t| (t.faction, t.count))
            };
            if let Some((faction, count)) = entry {
                *strength.entry(faction).or_insert(0) += u64::from(count);
            }
        }
        if let Some(castle) = self.castles.get(&tile) {
            *strength.entry(castle.owner).or_insert(0) += u64::from(castle.garrison);
        }
        strength
    }

    /// Returns `true` once a faction has been reported as eliminated.
    #[must_use]
    pub fn is_eliminated(&self, faction: FactionId) -> bool {
        self.eliminated.contains(&faction)
    }

    /// Records an elimination. Returns `false` if it was already recorded.
    pub(crate) fn mark_eliminated(&mut self, faction: FactionId) -> bool {
        self.eliminated.insert(faction)
    }

    // -------------------------------------------------------------------------
    // Consistency
    // -------------------------------------------------------------------------

    /// Verifies that the occupancy index mirrors stacks, transit units and
    /// garrisons exactly.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn check_invariants(&self) -> Result<(), StateError> {
        let mut seen = BTreeSet::new();
        for (&id, stack) in &self.stacks {
            if stack.count == 0 {
                return Err(StateError::EmptyStack(id));
            }
            self.check_indexed(id, stack.tile, OccupantKind::Stationary)?;
            if !seen.insert((stack.tile, stack.faction)) {
                return Err(StateError::DuplicateStack {
                    tile: stack.tile,
                    faction: stack.faction,
                });
            }
        }
        for (&id, transit) in &self.transits {
            self.check_indexed(id, transit.current_tile, OccupantKind::Transit)?;
        }
        for id in self.occupancy.occupants().into_keys() {
            if !self.stacks.contains_key(&id) && !self.transits.contains_key(&id) {
                return Err(StateError::OrphanedEntry(id));
            }
        }
        for (&tile, castle) in &self.castles {
            if self.occupancy.garrison_at(tile) != Some(castle.owner) {
                return Err(StateError::GarrisonMismatch(tile));
            }
        }
        Ok(())
    }

    fn check_indexed(&self, id: UnitId, actual: TileCoord, kind: OccupantKind) -> Result<(), StateError> {
        match self.occupancy.occupant(id) {
            None => Err(StateError::UntrackedUnit(id)),
            Some(occupant) if occupant.tile != actual => Err(StateError::TileMismatch {
                unit: id,
                indexed: occupant.tile,
                actual,
            }),
            Some(occupant) if occupant.kind != kind => Err(StateError::KindMismatch(id)),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TransitionKind;
    use crate::spell::SpellTargets;

    const RED: FactionId = FactionId::new(0);
    const BLUE: FactionId = FactionId::new(1);

    fn world() -> World {
        World::new(TerrainGrid::filled(6, 6, TerrainKind::Grassland).unwrap())
    }

    mod placement_tests {
        use super::*;

        #[test]
        fn place_stack_tracks_and_emits_enter() {
            let mut world = world();
            let id = world.place_stack(RED, TileCoord::new(1, 2), 7, UnitKind::Cavalry).unwrap();
            assert_eq!(world.occupancy().tile_of(id), Some(TileCoord::new(1, 2)));
            let events = world.take_events();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].as_transition().unwrap().kind, TransitionKind::Enter);
        }

        #[test]
        fn rejects_empty_and_out_of_bounds() {
            let mut world = world();
            assert_eq!(
                world.place_stack(RED, TileCoord::new(0, 0), 0, UnitKind::Infantry),
                Err(PlacementError::EmptyStack)
            );
            assert_eq!(
                world.place_stack(RED, TileCoord::new(6, 0), 3, UnitKind::Infantry),
                Err(PlacementError::OutOfBounds(TileCoord::new(6, 0)))
            );
        }

        #[test]
        fn different_factions_share_tile_without_merging() {
            let mut world = world();
            let tile = TileCoord::new(2, 2);
            let a = world.place_stack(RED, tile, 4, UnitKind::Infantry).unwrap();
            let b = world.place_stack(BLUE, tile, 4, UnitKind::Infantry).unwrap();
            assert_ne!(a, b);
            assert_eq!(world.stacks_on_tile(tile).len(), 2);
            assert!(world.occupancy().detect_collision(tile).is_some());
        }

        #[test]
        fn add_castle_marks_siege_target() {
            let mut world = world();
            let tile = TileCoord::new(3, 3);
            world.set_terrain(tile, TerrainKind::Mountain).unwrap();
            world.add_castle(Castle::new(tile, BLUE, 10)).unwrap();
            assert!(world.grid().is_siege_target(tile));
            assert_eq!(world.occupancy().garrison_at(tile), Some(BLUE));
            assert_eq!(
                world.add_castle(Castle::new(tile, RED, 1)),
                Err(PlacementError::CastleExists(tile))
            );
        }

        #[test]
        fn adjust_garrison_clamps_at_zero() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            world.add_castle(Castle::new(tile, RED, 5)).unwrap();
            assert_eq!(world.adjust_garrison(tile, 10), Ok(15));
            assert_eq!(world.adjust_garrison(tile, -40), Ok(0));
            assert_eq!(
                world.adjust_garrison(TileCoord::new(1, 1), 1),
                Err(PlacementError::NoCastle(TileCoord::new(1, 1)))
            );
        }
    }

    mod transit_tests {
        use super::*;

        #[test]
        fn spawn_transit_detaches_immediately() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            let stack = world.place_stack(RED, tile, 10, UnitKind::Infantry).unwrap();
            let transit = world.spawn_transit(MoveSource::Stack(stack), tile, 4, 1.0).unwrap();

            assert_eq!(world.stack(stack).unwrap().count, 6);
            assert_eq!(world.transit(transit).unwrap().count, 4);
            assert_eq!(world.faction_total(RED), 10);
            assert!(world.check_invariants().is_ok());
        }

        #[test]
        fn moving_whole_stack_removes_it() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            let stack = world.place_stack(RED, tile, 3, UnitKind::Infantry).unwrap();
            world.spawn_transit(MoveSource::Stack(stack), tile, 3, 1.0).unwrap();
            assert!(world.stack(stack).is_none());
            assert!(world.check_invariants().is_ok());
        }

        #[test]
        fn insufficient_units_leave_world_untouched() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            let stack = world.place_stack(RED, tile, 3, UnitKind::Infantry).unwrap();
            let err = world.spawn_transit(MoveSource::Stack(stack), tile, 5, 1.0).unwrap_err();
            assert_eq!(err, MoveError::InsufficientUnits { requested: 5, available: 3 });
            assert_eq!(world.stack(stack).unwrap().count, 3);
            assert_eq!(world.transits().count(), 0);
        }

        #[test]
        fn garrison_source_draws_from_castle() {
            let mut world = world();
            let tile = TileCoord::new(4, 4);
            world.add_castle(Castle::new(tile, BLUE, 12)).unwrap();
            let id = world.spawn_transit(MoveSource::Garrison(tile), tile, 5, 1.0).unwrap();
            assert_eq!(world.castle(tile).unwrap().garrison, 7);
            assert_eq!(world.transit(id).unwrap().faction, BLUE);
        }

        #[test]
        fn settle_keeps_id_and_index() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            let stack = world.place_stack(RED, tile, 3, UnitKind::Infantry).unwrap();
            let id = world.spawn_transit(MoveSource::Stack(stack), tile, 3, 1.0).unwrap();
            world.transit_mut(id).unwrap().path.push_back(TileCoord::new(1, 0));
            world.hop_transit(id);
            world.take_events();

            assert_eq!(world.settle_transit(id, 3), Some(id));
            assert!(world.take_events().is_empty());
            assert_eq!(world.stack(id).unwrap().tile, TileCoord::new(1, 0));
            assert!(world.check_invariants().is_ok());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn strength_on_tile_includes_garrison() {
            let mut world = world();
            let tile = TileCoord::new(2, 2);
            world.add_castle(Castle::new(tile, RED, 8)).unwrap();
            world.place_stack(RED, tile, 2, UnitKind::Infantry).unwrap();
            world.place_stack(BLUE, tile, 5, UnitKind::Infantry).unwrap();
            let strength = world.strength_on_tile(tile);
            assert_eq!(strength.get(&RED), Some(&10));
            assert_eq!(strength.get(&BLUE), Some(&5));
        }

        #[test]
        fn friendly_castle_is_not_a_collision() {
            let mut world = world();
            let tile = TileCoord::new(2, 2);
            world.add_castle(Castle::new(tile, RED, 8)).unwrap();
            world.place_stack(RED, tile, 3, UnitKind::Infantry).unwrap();
            assert!(world.occupancy().detect_collision(tile).is_none());
            world.place_stack(BLUE, tile, 3, UnitKind::Infantry).unwrap();
            assert!(world.occupancy().detect_collision(tile).is_some());
        }

        #[test]
        fn spell_queue_round_trip() {
            let mut world = world();
            let tile = TileCoord::new(1, 1);
            world
                .queue_spell(tile, SpellEffect::buff(2.0, SpellTargets::ATTACKER))
                .unwrap();
            assert_eq!(world.pending_spells(tile).len(), 1);
            assert_eq!(world.take_spells(tile).len(), 1);
            assert!(world.pending_spells(tile).is_empty());
        }
    }

    mod invariant_tests {
        use super::*;

        #[test]
        fn detects_orphaned_index_entry() {
            let mut world = world();
            world.occupancy.track(UnitId::new(99), RED, TileCoord::new(0, 0), OccupantKind::Stationary);
            assert_eq!(world.check_invariants(), Err(StateError::OrphanedEntry(UnitId::new(99))));
        }

        #[test]
        fn detects_stale_tile() {
            let mut world = world();
            let id = world.place_stack(RED, TileCoord::new(0, 0), 1, UnitKind::Infantry).unwrap();
            world.stacks.get_mut(&id).unwrap().tile = TileCoord::new(5, 5);
            assert!(matches!(world.check_invariants(), Err(StateError::TileMismatch { .. })));
        }

        #[test]
        fn detects_wrong_occupant_kind() {
            let mut world = world();
            let id = world.place_stack(RED, TileCoord::new(0, 0), 1, UnitKind::Infantry).unwrap();
            world.occupancy.set_kind(id, OccupantKind::Transit);
            assert_eq!(world.check_invariants(), Err(StateError::KindMismatch(id)));
        }

        #[test]
        fn settled_transit_becomes_a_holder() {
            let mut world = world();
            let tile = TileCoord::new(0, 0);
            world.place_stack(BLUE, tile, 2, UnitKind::Infantry).unwrap();
            let source = world.place_stack(RED, tile, 4, UnitKind::Infantry).unwrap();
            let id = world.spawn_transit(MoveSource::Stack(source), tile, 4, 1.0).unwrap();
            assert!(world.check_invariants().is_ok());

            world.settle_transit(id, 4);
            assert!(world.check_invariants().is_ok());
            let collision = world.occupancy().detect_collision(tile).unwrap();
            assert!(collision.units.contains(&id));
        }
    }
}
