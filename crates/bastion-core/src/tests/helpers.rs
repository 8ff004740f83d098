//! Test helper functions for setting up simulations and forces.

use bastion_grid::{MapGenerator, TerrainGrid, TerrainKind, TileCoord};

use crate::config::SimConfig;
use crate::entity::{FactionId, MoveSource, UnitId, UnitKind};
use crate::event::SimEvent;
use crate::resolver::CombatResolution;
use crate::simulation::{MoveRequest, Simulation};

/// First test faction.
pub const RED: FactionId = FactionId::new(0);
/// Second test faction.
pub const BLUE: FactionId = FactionId::new(1);
/// Third test faction.
pub const GREEN: FactionId = FactionId::new(2);

/// Base time per tile used by test simulations, in milliseconds.
pub const TILE_MS: f64 = 1000.0;

// =============================================================================
// Simulation Setup
// =============================================================================

/// Creates a simulation over an all-grassland grid with default config.
pub fn open_sim(width: i32, height: i32) -> Simulation {
    let grid = TerrainGrid::filled(width, height, TerrainKind::Grassland).unwrap();
    Simulation::new(grid, SimConfig::default()).unwrap()
}

/// Creates a simulation over a seeded generated map.
pub fn generated_sim(seed: u64, width: i32, height: i32) -> Simulation {
    let grid = MapGenerator::new(seed).generate(width, height).unwrap();
    Simulation::new(grid, SimConfig::default()).unwrap()
}

/// Shorthand for a tile coordinate.
pub fn tile(x: i32, y: i32) -> TileCoord {
    TileCoord::new(x, y)
}

// =============================================================================
// Forces
// =============================================================================

/// Places an infantry stack.
pub fn stack(sim: &mut Simulation, faction: FactionId, at: TileCoord, count: u32) -> UnitId {
    sim.place_stack(faction, at, count, UnitKind::Infantry).unwrap()
}

/// Places a stack and sends all of it to `to`, returning the transit id.
pub fn march(sim: &mut Simulation, faction: FactionId, from: TileCoord, to: TileCoord, count: u32) -> UnitId {
    let source = stack(sim, faction, from, count);
    sim.issue_move(&MoveRequest::new(MoveSource::Stack(source), from, to, count))
        .unwrap()
}

/// Steps the simulation `steps` times by one tile's worth of time.
pub fn run_tiles(sim: &mut Simulation, steps: usize) {
    for _ in 0..steps {
        sim.step(TILE_MS);
    }
}

/// Steps until no transit unit is moving, up to `max_steps`.
pub fn run_until_idle(sim: &mut Simulation, delta_ms: f64, max_steps: usize) {
    for _ in 0..max_steps {
        if sim.world().moving_transits().is_empty() {
            return;
        }
        sim.step(delta_ms);
    }
}

// =============================================================================
// Event Queries
// =============================================================================

/// Combat resolutions in emission order.
pub fn combats(events: &[SimEvent]) -> Vec<&CombatResolution> {
    events.iter().filter_map(SimEvent::as_combat).collect()
}

/// Factions reported eliminated, in emission order.
pub fn eliminations(events: &[SimEvent]) -> Vec<FactionId> {
    events
        .iter()
        .filter_map(|event| match event {
            SimEvent::FactionEliminated { faction, .. } => Some(*faction),
            _ => None,
        })
        .collect()
}

/// Total units held by every faction.
pub fn grand_total(sim: &Simulation) -> u64 {
    sim.world()
        .factions()
        .into_iter()
        .map(|faction| sim.world().faction_total(faction))
        .sum()
}
