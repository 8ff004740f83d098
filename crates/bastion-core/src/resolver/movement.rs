//! Tick-driven movement of transit units.
//!
//! The `MovementScheduler` advances every moving [`TransitUnit`] along its
//! path. Each hop takes
//!
//! ```text
//! time_per_tile = base_time_per_tile / (speed * movement_modifier(next_tile))
//! ```
//!
//! where the modifier is read from live terrain every tick, so terrain changes
//! apply to units already on the move. A large delta is spent hop by hop, so
//! every tile entered is checked for interception even when a unit crosses
//! several tiles in one tick.
//!
//! # Hand-off to Combat
//!
//! Entering a tile where the occupancy tracker reports a collision with a
//! foreign stationary stack or castle intercepts the unit and resolves the
//! tile at once. Reaching the end of the path always
//! resolves the destination: a friendly or empty tile merges, a hostile one
//! fights.
//!
//! [`TransitUnit`]: crate::entity::TransitUnit

use std::collections::VecDeque;

use bastion_grid::{TerrainGrid, TileCoord};
use tracing::{debug, instrument, trace};

use super::combat::{ArrivalFate, CombatResolver};
use crate::entity::{MovementState, TransitUnit, UnitId};
use crate::event::{SimEvent, SimTime};
use crate::world::World;

/// Tolerance for floating point time accounting.
const TIME_EPSILON: f64 = 1e-9;

/// Advances transit units through simulated time.
#[derive(Debug, Clone)]
pub struct MovementScheduler {
    base_time_per_tile_ms: f64,
}

impl MovementScheduler {
    /// Creates a scheduler with the given base time per tile.
    #[must_use]
    pub fn new(base_time_per_tile_ms: f64) -> Self {
        Self {
            base_time_per_tile_ms,
        }
    }

    /// Base time to cross a neutral tile at speed 1.0.
    #[must_use]
    pub fn base_time_per_tile_ms(&self) -> f64 {
        self.base_time_per_tile_ms
    }

    /// Time to enter a tile with the given movement modifier.
    #[must_use]
    pub fn time_per_tile(&self, speed: f64, modifier: f64) -> f64 {
        self.base_time_per_tile_ms / (speed * modifier)
    }

    /// Sets a transit unit moving along `path`.
    ///
    /// A leading entry equal to the unit's current tile is dropped. Returns
    /// `false` and leaves the unit untouched when no steps remain.
    pub fn start_movement(&self, world: &mut World, id: UnitId, path: Vec<TileCoord>) -> bool {
        let Some(transit) = world.transit_mut(id) else {
            return false;
        };
        let mut steps: VecDeque<TileCoord> = path.into();
        if steps.front() == Some(&transit.current_tile) {
            steps.pop_front();
        }
        let Some(&to) = steps.back() else {
            return false;
        };

        transit.path = steps;
        transit.progress = 0.0;
        transit.state = MovementState::Moving;
        let (faction, from, count) = (transit.faction, transit.current_tile, transit.count);

        world.push_event(SimEvent::MovementStarted {
            time: world.time(),
            unit: id,
            faction,
            from,
            to,
            count,
        });
        true
    }

    /// Cancels a transit unit and removes it from the world.
    ///
    /// The remaining path is discarded and the units are not placed on any
    /// tile; the removed unit is returned so the caller can decide what
    /// becomes of them.
    pub fn stop_movement(&self, world: &mut World, id: UnitId) -> Option<TransitUnit> {
        let (faction, tile) = {
            let transit = world.transit_mut(id)?;
            transit.state = MovementState::Cancelled;
            transit.path.clear();
            (transit.faction, transit.current_tile)
        };
        world.push_event(SimEvent::MovementCancelled {
            time: world.time(),
            unit: id,
            faction,
            tile,
        });
        debug!(%id, %tile, "movement cancelled");
        world.remove_transit(id)
    }

    /// Advances every moving unit by `delta_ms` in id order.
    #[instrument(skip(self, world, resolver))]
    pub fn tick(&self, world: &mut World, resolver: &CombatResolver, delta_ms: f64) {
        let start = world.time();
        let delta = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };
        for id in world.moving_transits() {
            self.advance(world, resolver, id, start, delta);
        }
        world.set_time(start.advanced(delta));
    }

    /// Spends up to `delta` of one unit's time, hop by hop.
    fn advance(&self, world: &mut World, resolver: &CombatResolver, id: UnitId, start: SimTime, delta: f64) {
        world.set_time(start);
        let mut remaining = delta;
        loop {
            let Some(transit) = world.transit(id).filter(|t| t.is_moving()) else {
                return;
            };
            let (current, speed, progress) = (transit.current_tile, transit.speed, transit.progress);

            let Some(next) = transit.next_tile() else {
                // Nothing left to walk; settle where it stands.
                self.arrive(world, resolver, id, current);
                return;
            };
            let modifier = if transit.on_final_hop() {
                world.grid().approach_modifier_at(next)
            } else {
                world.grid().movement_modifier_at(next)
            };
            let Some(modifier) = modifier.map(f64::from).filter(|&m| m > 0.0) else {
                self.block(world, resolver, id, current, next);
                return;
            };

            let time_per_tile = self.time_per_tile(speed, modifier);
            let needed = (1.0 - progress) * time_per_tile;
            if remaining + TIME_EPSILON < needed {
                if let Some(transit) = world.transit_mut(id) {
                    transit.progress += remaining / time_per_tile;
                }
                return;
            }

            remaining = (remaining - needed).max(0.0);
            world.set_time(start.offset(delta - remaining));
            let Some(entered) = world.hop_transit(id) else {
                return;
            };
            trace!(%id, from = %current, to = %entered, "hop");

            if world.transit(id).is_some_and(|t| t.path.is_empty()) {
                self.arrive(world, resolver, id, entered);
                return;
            }
            let contested = world.occupancy().detect_arrival(entered, id).is_some();
            if contested && !self.intercept(world, resolver, id, entered) {
                return;
            }
        }
    }

    fn arrive(&self, world: &mut World, resolver: &CombatResolver, id: UnitId, tile: TileCoord) {
        let Some(transit) = world.transit_mut(id) else {
            return;
        };
        transit.state = MovementState::Arrived;
        let (faction, count) = (transit.faction, transit.count);
        world.push_event(SimEvent::Arrived {
            time: world.time(),
            unit: id,
            faction,
            tile,
            count,
        });
        resolver.resolve_tile(world, tile, Some(id));
    }

    /// Resolves an interception. Returns `true` if the unit keeps marching.
    fn intercept(&self, world: &mut World, resolver: &CombatResolver, id: UnitId, tile: TileCoord) -> bool {
        let Some(transit) = world.transit_mut(id) else {
            return false;
        };
        transit.state = MovementState::Intercepted;
        let faction = transit.faction;
        world.push_event(SimEvent::Intercepted {
            time: world.time(),
            unit: id,
            faction,
            tile,
        });
        debug!(%id, %tile, "intercepted");

        let fate = resolver
            .resolve_tile(world, tile, Some(id))
            .and_then(|resolved| resolved.arrival);
        if let Some(ArrivalFate::Continue { .. }) = fate {
            if let Some(transit) = world.transit_mut(id) {
                transit.state = MovementState::Moving;
                return true;
            }
        }
        false
    }

    /// Halts a unit whose next tile has become impassable.
    fn block(
        &self,
        world: &mut World,
        resolver: &CombatResolver,
        id: UnitId,
        tile: TileCoord,
        blocked: TileCoord,
    ) {
        let Some(transit) = world.transit_mut(id) else {
            return;
        };
        transit.path.clear();
        transit.progress = 0.0;
        transit.state = MovementState::Cancelled;
        let faction = transit.faction;
        world.push_event(SimEvent::MovementBlocked {
            time: world.time(),
            unit: id,
            faction,
            tile,
            blocked,
        });
        debug!(%id, %tile, %blocked, "movement blocked by terrain");
        resolver.resolve_tile(world, tile, Some(id));
    }

    /// Estimated time to walk `path` at `speed` on the current grid.
    ///
    /// The first entry is the start tile and costs nothing. Intended for
    /// planning; ticking re-reads live terrain. Returns `None` if a step is
    /// impassable or the speed is not positive.
    #[must_use]
    pub fn calculate_movement_time(&self, grid: &TerrainGrid, path: &[TileCoord], speed: f64) -> Option<f64> {
        if speed.is_nan() || speed <= 0.0 {
            return None;
        }
        let last = path.len().checked_sub(1)?;
        path.iter()
            .enumerate()
            .skip(1)
            .map(|(i, &tile)| {
                let modifier = if i == last {
                    grid.approach_modifier_at(tile)
                } else {
                    grid.movement_modifier_at(tile)
                };
                modifier
                    .map(f64::from)
                    .filter(|&m| m > 0.0)
                    .map(|m| self.time_per_tile(speed, m))
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{FactionId, MoveSource, UnitKind};
    use bastion_grid::TerrainKind;

    const RED: FactionId = FactionId::new(0);
    const BLUE: FactionId = FactionId::new(1);

    fn world() -> World {
        World::new(TerrainGrid::filled(8, 3, TerrainKind::Grassland).unwrap())
    }

    fn row(from: i32, to: i32) -> Vec<TileCoord> {
        (from..=to).map(|x| TileCoord::new(x, 0)).collect()
    }

    fn launch(world: &mut World, faction: FactionId, count: u32, path: Vec<TileCoord>) -> UnitId {
        let origin = path[0];
        let stack = world.place_stack(faction, origin, count, UnitKind::Infantry).unwrap();
        let id = world
            .spawn_transit(MoveSource::Stack(stack), origin, count, 1.0)
            .unwrap();
        assert!(MovementScheduler::new(100.0).start_movement(world, id, path));
        id
    }

    mod start_tests {
        use super::*;

        #[test]
        fn empty_path_is_noop() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 2));
            let scheduler = MovementScheduler::new(100.0);
            world.transit_mut(id).unwrap().state = MovementState::Idle;
            assert!(!scheduler.start_movement(&mut world, id, vec![]));
            assert!(!scheduler.start_movement(&mut world, id, vec![TileCoord::new(0, 0)]));
        }

        #[test]
        fn leading_current_tile_is_stripped() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 2));
            let transit = world.transit(id).unwrap();
            assert_eq!(transit.path.len(), 2);
            assert_eq!(transit.state, MovementState::Moving);
        }
    }

    mod tick_tests {
        use super::*;

        #[test]
        fn partial_progress_accumulates() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 2));
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 40.0);
            let transit = world.transit(id).unwrap();
            assert_eq!(transit.current_tile, TileCoord::new(0, 0));
            assert!((transit.progress - 0.4).abs() < 1e-9);
        }

        #[test]
        fn large_delta_walks_every_tile() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 5));
            world.take_events();
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 10_000.0);

            assert!(world.transit(id).is_none());
            let stack = world.stack(id).unwrap();
            assert_eq!(stack.tile, TileCoord::new(5, 0));
            assert_eq!(stack.count, 3);

            let entered: Vec<TileCoord> = world
                .take_events()
                .iter()
                .filter_map(SimEvent::as_transition)
                .filter(|t| t.kind == crate::event::TransitionKind::Enter)
                .map(|t| t.tile)
                .collect();
            assert_eq!(entered, row(1, 5));
        }

        #[test]
        fn interception_stops_loser_mid_path() {
            let mut world = world();
            world.place_stack(BLUE, TileCoord::new(2, 0), 10, UnitKind::Infantry).unwrap();
            let id = launch(&mut world, RED, 4, row(0, 5));
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 10_000.0);

            assert!(world.transit(id).is_none());
            assert_eq!(world.stack_at(TileCoord::new(2, 0), BLUE).unwrap().count, 6);
            assert!(world.stacks_on_tile(TileCoord::new(5, 0)).is_empty());
        }

        #[test]
        fn winner_of_interception_keeps_marching() {
            let mut world = world();
            world.place_stack(BLUE, TileCoord::new(2, 0), 3, UnitKind::Infantry).unwrap();
            let id = launch(&mut world, RED, 10, row(0, 5));
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 10_000.0);

            assert!(world.stacks_on_tile(TileCoord::new(2, 0)).is_empty());
            assert_eq!(world.stack(id).unwrap().tile, TileCoord::new(5, 0));
            assert_eq!(world.stack(id).unwrap().count, 7);
        }

        #[test]
        fn blocked_terrain_halts_on_current_tile() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 4));
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 150.0);
            world.set_terrain(TileCoord::new(2, 0), TerrainKind::Water).unwrap();
            world.take_events();
            scheduler.tick(&mut world, &CombatResolver::new(), 1_000.0);

            assert_eq!(world.stack(id).unwrap().tile, TileCoord::new(1, 0));
            assert!(world
                .take_events()
                .iter()
                .any(|e| matches!(e, SimEvent::MovementBlocked { blocked, .. } if *blocked == TileCoord::new(2, 0))));
        }

        #[test]
        fn only_tracker_collisions_intercept() {
            let mut world = world();
            world.place_stack(BLUE, TileCoord::new(2, 0), 2, UnitKind::Infantry).unwrap();
            let parked = world.place_stack(BLUE, TileCoord::new(4, 0), 5, UnitKind::Infantry).unwrap();
            let parked = world
                .spawn_transit(MoveSource::Stack(parked), TileCoord::new(4, 0), 5, 1.0)
                .unwrap();
            let id = launch(&mut world, RED, 10, row(0, 5));
            assert!(world.occupancy().detect_collision(TileCoord::new(4, 0)).is_none());
            world.take_events();

            MovementScheduler::new(100.0).tick(&mut world, &CombatResolver::new(), 10_000.0);

            let intercepted: Vec<TileCoord> = world
                .take_events()
                .iter()
                .filter_map(|e| match e {
                    SimEvent::Intercepted { tile, .. } => Some(*tile),
                    _ => None,
                })
                .collect();
            assert_eq!(intercepted, vec![TileCoord::new(2, 0)]);
            assert_eq!(world.transit(parked).unwrap().count, 5);
            assert_eq!(world.stack(id).unwrap().tile, TileCoord::new(5, 0));
            assert_eq!(world.stack(id).unwrap().count, 8);
        }

        #[test]
        fn events_of_each_unit_start_at_tick_start() {
            let mut world = world();
            let runner = launch(&mut world, RED, 3, row(0, 4));
            let path = vec![TileCoord::new(0, 1), TileCoord::new(1, 1), TileCoord::new(2, 1)];
            let stuck = launch(&mut world, BLUE, 3, path);
            assert!(runner < stuck);
            world.set_terrain(TileCoord::new(1, 1), TerrainKind::Water).unwrap();
            world.take_events();

            MovementScheduler::new(100.0).tick(&mut world, &CombatResolver::new(), 300.0);

            let blocked_at = world
                .take_events()
                .iter()
                .find_map(|e| match e {
                    SimEvent::MovementBlocked { time, .. } => Some(*time),
                    _ => None,
                })
                .unwrap();
            assert_eq!(blocked_at, SimTime::default());
            assert_eq!(world.transit(runner).unwrap().current_tile, TileCoord::new(3, 0));
        }

        #[test]
        fn tick_advances_time() {
            let mut world = world();
            let scheduler = MovementScheduler::new(100.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 16.0);
            scheduler.tick(&mut world, &CombatResolver::new(), 16.0);
            assert_eq!(world.time().tick, 2);
            assert!((world.time().elapsed_ms - 32.0).abs() < 1e-9);
        }
    }

    mod stop_tests {
        use super::*;

        #[test]
        fn stop_removes_without_materialising() {
            let mut world = world();
            let id = launch(&mut world, RED, 3, row(0, 4));
            let scheduler = MovementScheduler::new(100.0);
            let stopped = scheduler.stop_movement(&mut world, id).unwrap();

            assert_eq!(stopped.state, MovementState::Cancelled);
            assert!(stopped.path.is_empty());
            assert_eq!(world.faction_total(RED), 0);
            assert!(world.occupancy().tile_of(id).is_none());
            assert!(scheduler.stop_movement(&mut world, id).is_none());
        }
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn road_and_swamp_times() {
            let mut grid = TerrainGrid::filled(3, 1, TerrainKind::Grassland).unwrap();
            grid.set_terrain(TileCoord::new(1, 0), TerrainKind::Road).unwrap();
            grid.set_terrain(TileCoord::new(2, 0), TerrainKind::Swamp).unwrap();
            let scheduler = MovementScheduler::new(1000.0);

            let road = scheduler.calculate_movement_time(&grid, &row(0, 1), 10.0).unwrap();
            assert!((road - 50.0).abs() < 1e-9);
            let both = scheduler.calculate_movement_time(&grid, &row(0, 2), 10.0).unwrap();
            assert!((both - 250.0).abs() < 1e-9);
        }

        #[test]
        fn impassable_step_has_no_time() {
            let mut grid = TerrainGrid::filled(3, 1, TerrainKind::Grassland).unwrap();
            grid.set_terrain(TileCoord::new(1, 0), TerrainKind::Mountain).unwrap();
            let scheduler = MovementScheduler::new(1000.0);
            assert_eq!(scheduler.calculate_movement_time(&grid, &row(0, 2), 1.0), None);
            assert_eq!(scheduler.calculate_movement_time(&grid, &[], 1.0), None);
            assert_eq!(scheduler.calculate_movement_time(&grid, &row(0, 0), 1.0), Some(0.0));
        }
    }
}
