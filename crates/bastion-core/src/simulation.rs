//! Simulation orchestrator.
//!
//! The `Simulation` owns the [`World`] and drives it one step at a time:
//!
//! 1. **REQUESTS**: Move requests are validated, pathed and turned into
//!    transit units before the step
//! 2. **MOVEMENT**: The [`MovementScheduler`] advances every transit unit by
//!    the step's delta, updating occupancy as tiles are entered
//! 3. **COMBAT**: Arrivals and interceptions are resolved synchronously by the
//!    [`CombatResolver`] inside the movement pass
//! 4. **EVENTS**: Transitions, combat outcomes and eliminations accumulate in
//!    the event log until the caller drains them
//!
//! # Determinism
//!
//! The simulation uses no randomness. Entities live in `BTreeMap`s, ticks walk
//! transit units in id order and combat walks factions in id order, so the
//! same requests and deltas always produce the same events. Batched path
//! searches run in parallel but are applied in request order.
//!
//! # Example
//!
//! ```
//! use bastion_core::config::SimConfig;
//! use bastion_core::entity::{FactionId, MoveSource, UnitKind};
//! use bastion_core::simulation::{MoveRequest, Simulation};
//! use bastion_grid::{TerrainGrid, TerrainKind, TileCoord};
//!
//! let grid = TerrainGrid::filled(8, 8, TerrainKind::Grassland).unwrap();
//! let mut sim = Simulation::new(grid, SimConfig::default()).unwrap();
//!
//! let red = FactionId::new(0);
//! let from = TileCoord::new(0, 0);
//! let stack = sim.place_stack(red, from, 10, UnitKind::Infantry).unwrap();
//!
//! let unit = sim
//!     .issue_move(&MoveRequest::new(MoveSource::Stack(stack), from, TileCoord::new(3, 0), 10))
//!     .unwrap();
//!
//! for _ in 0..4 {
//!     sim.step(1000.0);
//! }
//! assert_eq!(sim.world().stack(unit).unwrap().tile, TileCoord::new(3, 0));
//! ```

use bastion_grid::{Path, Pathfinder, SearchOutcome, TerrainGrid, TileCoord};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::SimConfig;
use crate::entity::{Castle, FactionId, MoveSource, MovementState, TransitUnit, UnitId, UnitKind};
use crate::error::{ConfigError, MoveError, PlacementError, StateError};
use crate::event::{SimEvent, SimTime};
use crate::resolver::{CombatResolution, CombatResolver, MovementScheduler, TileResolution};
use crate::situation::SituationReport;
use crate::spell::SpellEffect;
use crate::world::World;

/// Request to move units from a stack or garrison to another tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Where the units come from.
    pub source: MoveSource,
    /// Tile the source stands on.
    pub from: TileCoord,
    /// Destination tile.
    pub to: TileCoord,
    /// Units to move.
    pub count: u32,
}

impl MoveRequest {
    /// Creates a move request.
    #[must_use]
    pub fn new(source: MoveSource, from: TileCoord, to: TileCoord, count: u32) -> Self {
        Self {
            source,
            from,
            to,
            count,
        }
    }
}

/// Tactical simulation driven by fixed or variable time steps.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: World,
    config: SimConfig,
    scheduler: MovementScheduler,
    resolver: CombatResolver,
}

impl Simulation {
    /// Creates a simulation over `grid`.
    ///
    /// The grid's terrain table is replaced by the one in `config`.
    ///
    /// # Errors
    ///
    /// Returns the first invalid constant in `config`.
    pub fn new(mut grid: TerrainGrid, config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        grid.set_model(config.terrain.clone());
        Ok(Self {
            world: World::new(grid),
            scheduler: MovementScheduler::new(config.base_time_per_tile_ms),
            resolver: CombatResolver::new(),
            config,
        })
    }

    /// The simulation state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable simulation state, for external placement and terrain edits.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current simulated time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.world.time()
    }

    // -------------------------------------------------------------------------
    // Setup
    // -------------------------------------------------------------------------

    /// Places a stationary stack. See [`World::place_stack`].
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
        self.world.place_stack(faction, tile, count, kind)
    }

    /// Adds a castle with the configured default capacity.
    ///
    /// # Errors
    ///
    /// Rejects tiles outside the grid and tiles that already hold a castle.
    pub fn add_castle(&mut self, tile: TileCoord, owner: FactionId, garrison: u32) -> Result<(), PlacementError> {
        let castle = Castle::new(tile, owner, garrison).with_capacity(self.config.default_garrison_capacity);
        self.world.add_castle(castle)
    }

    /// Queues a spell for the next contested resolution on `tile`.
    ///
    /// # Errors
    ///
    /// Returns [`PlacementError::OutOfBounds`] for tiles outside the grid.
    pub fn queue_spell(&mut self, tile: TileCoord, spell: SpellEffect) -> Result<(), PlacementError> {
        self.world.queue_spell(tile, spell)
    }

    // -------------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------------

    fn pathfinder(&self) -> Pathfinder<'_> {
        Pathfinder::new(self.world.grid()).with_budget(self.config.search_budget)
    }

    /// Searches a path on the current grid with the configured budget.
    #[must_use]
    pub fn find_path(&self, start: TileCoord, goal: TileCoord) -> Path {
        self.pathfinder().find_path(start, goal)
    }

    /// Estimated time for a unit type to walk `path`, in milliseconds.
    #[must_use]
    pub fn estimate_travel_time(&self, path: &[TileCoord], kind: UnitKind) -> Option<f64> {
        self.scheduler
            .calculate_movement_time(self.world.grid(), path, self.config.speed_for(kind))
    }

    /// Validates a request, finds its path and sets a transit unit moving.
    ///
    /// The units leave their stack or garrison immediately.
    ///
    /// # Errors
    ///
    /// Checks, in order: zero count, tiles outside the grid, a move onto its
    /// own tile, an unknown source, too few units, then the path search.
    /// A rejected request leaves the world untouched.
    #[must_use = "a rejected move request leaves the world untouched"]
    pub fn issue_move(&mut self, request: &MoveRequest) -> Result<UnitId, MoveError> {
        self.precheck(request)?;
        self.check_source(request)?;
        let path = self.find_path(request.from, request.to);
        self.commit(request, &path)
    }

    /// Issues many move requests, searching their paths in parallel.
    ///
    /// Requests are applied in order, so an earlier request can drain a source
    /// a later one relies on.
    #[instrument(skip_all, fields(count = requests.len()))]
    pub fn issue_moves(&mut self, requests: &[MoveRequest]) -> Vec<Result<UnitId, MoveError>> {
        let searchable: Vec<(TileCoord, TileCoord)> = requests
            .iter()
            .filter(|request| self.precheck(request).is_ok())
            .map(|request| (request.from, request.to))
            .collect();
        let mut paths = self.pathfinder().find_paths(&searchable).into_iter();

        requests
            .iter()
            .map(|request| {
                self.precheck(request)?;
                let Some(path) = paths.next() else {
                    return Err(MoveError::Unreachable {
                        from: request.from,
                        to: request.to,
                    });
                };
                self.check_source(request)?;
                self.commit(request, &path)
            })
            .collect()
    }

    /// Checks that only depend on the request and the grid.
    fn precheck(&self, request: &MoveRequest) -> Result<(), MoveError> {
        if request.count == 0 {
            return Err(MoveError::ZeroCount);
        }
        for tile in [request.from, request.to] {
            if !self.world.grid().in_bounds(tile) {
                return Err(MoveError::OutOfBounds(tile));
            }
        }
        if request.from == request.to {
            return Err(MoveError::SelfTarget(request.from));
        }
        Ok(())
    }

    fn check_source(&self, request: &MoveRequest) -> Result<(), MoveError> {
        let info = self.world.source_info(request.source, request.from)?;
        if info.available < request.count {
            return Err(MoveError::InsufficientUnits {
                requested: request.count,
                available: info.available,
            });
        }
        Ok(())
    }

    fn commit(&mut self, request: &MoveRequest, path: &Path) -> Result<UnitId, MoveError> {
        let (from, to) = (request.from, request.to);
        match path.outcome() {
            SearchOutcome::Found => {}
            SearchOutcome::BudgetExhausted => return Err(MoveError::SearchBudgetExhausted { from, to }),
            SearchOutcome::OutOfBounds => return Err(MoveError::OutOfBounds(to)),
            SearchOutcome::Trivial => return Err(MoveError::SelfTarget(from)),
            SearchOutcome::Unreachable => return Err(MoveError::Unreachable { from, to }),
        }

        let kind = self.world.source_info(request.source, from)?.kind;
        let speed = self.config.speed_for(kind);
        let id = self
            .world
            .spawn_transit(request.source, from, request.count, speed)?;
        self.scheduler
            .start_movement(&mut self.world, id, path.steps().to_vec());
        debug!(%id, %from, %to, count = request.count, hops = path.len(), "move issued");
        Ok(id)
    }

    /// Cancels a transit unit and removes it from the world.
    ///
    /// The units are returned to the caller, not placed anywhere.
    pub fn stop_movement(&mut self, id: UnitId) -> Option<TransitUnit> {
        self.scheduler.stop_movement(&mut self.world, id)
    }

    /// Stops a transit unit and settles it on its current tile.
    ///
    /// Settling a unit on a tile held by another faction fights for it.
    pub fn halt_movement(&mut self, id: UnitId) -> Option<TileResolution> {
        let (faction, tile) = {
            let transit = self.world.transit_mut(id)?;
            transit.path.clear();
            transit.progress = 0.0;
            transit.state = MovementState::Cancelled;
            (transit.faction, transit.current_tile)
        };
        self.world.push_event(SimEvent::MovementCancelled {
            time: self.world.time(),
            unit: id,
            faction,
            tile,
        });
        self.resolver.resolve_tile(&mut self.world, tile, Some(id))
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advances the simulation by `delta_ms` milliseconds.
    ///
    /// Every transit unit moves, every tile it enters is checked, and every
    /// collision is resolved before this returns.
    pub fn step(&mut self, delta_ms: f64) {
        self.scheduler.tick(&mut self.world, &self.resolver, delta_ms);
        debug_assert!(
            self.world.check_invariants().is_ok(),
            "occupancy index out of sync: {:?}",
            self.world.check_invariants()
        );
    }

    /// Resolves `tile` as it stands, for example after external placement.
    ///
    /// Returns `None` if nothing occupies the tile.
    pub fn resolve_tile(&mut self, tile: TileCoord) -> Option<CombatResolution> {
        self.resolver
            .resolve_tile(&mut self.world, tile, None)
            .map(|resolved| resolved.resolution)
    }

    /// Drains recorded events in emission order.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        self.world.take_events()
    }

    /// Builds a situation report for `faction`.
    #[must_use]
    pub fn situation(&self, faction: FactionId) -> SituationReport {
        SituationReport::build(&self.world, faction)
    }

    /// Verifies the occupancy index against the entities it tracks.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn check_invariants(&self) -> Result<(), StateError> {
        self.world.check_invariants()
    }
}
