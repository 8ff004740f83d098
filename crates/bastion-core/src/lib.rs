//! # Bastion Core
//!
//! Tactical simulation core for Bastion, a tile-based real-time strategy game.
//!
//! This crate decides how units traverse the grid, how factions contest the
//! same tile and how battles resolve. It sits on top of [`bastion_grid`],
//! which owns terrain and pathfinding.
//!
//! ## Architecture
//!
//! - **Entities**: stationary stacks, castles and transit units
//!   ([`entity`])
//! - **State**: the [`World`] container with its occupancy index
//!   ([`occupancy`]), spell queues and event log ([`event`])
//! - **Resolvers**: the movement scheduler and the combat resolver
//!   ([`resolver`])
//! - **Orchestration**: [`Simulation`] validates move requests and steps time
//!
//! Control flows one way: a move request is pathed, the scheduler walks the
//! path tick by tick, occupancy reports every tile entered, and any tile shared
//! by several factions is resolved before the step ends. Outcomes surface as
//! [`SimEvent`]s for the AI, victory detection and presentation layers.
//!
//! ## Usage
//!
//! ```
//! use bastion_core::{FactionId, MoveRequest, MoveSource, SimConfig, Simulation, UnitKind};
//! use bastion_grid::{TerrainGrid, TerrainKind, TileCoord};
//!
//! let grid = TerrainGrid::filled(10, 10, TerrainKind::Grassland).unwrap();
//! let mut sim = Simulation::new(grid, SimConfig::default()).unwrap();
//!
//! let red = FactionId::new(0);
//! let blue = FactionId::new(1);
//! let red_home = TileCoord::new(0, 0);
//! sim.add_castle(TileCoord::new(4, 0), blue, 5).unwrap();
//! let army = sim.place_stack(red, red_home, 12, UnitKind::Infantry).unwrap();
//!
//! sim.issue_move(&MoveRequest::new(MoveSource::Stack(army), red_home, TileCoord::new(4, 0), 12))
//!     .unwrap();
//! for _ in 0..5 {
//!     sim.step(1000.0);
//! }
//!
//! let castle = sim.world().castle(TileCoord::new(4, 0)).unwrap();
//! assert_eq!(castle.owner, red);
//! assert_eq!(castle.garrison, 7);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod occupancy;
pub mod resolver;
pub mod simulation;
pub mod situation;
pub mod spell;
pub mod world;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use config::SimConfig;
pub use entity::{Castle, FactionId, MoveSource, MovementState, TransitUnit, UnitId, UnitKind, UnitStack};
pub use error::{ConfigError, MoveError, PlacementError, StateError};
pub use event::{EventLog, SimEvent, SimTime, TransitionEvent, TransitionKind};
pub use occupancy::{Collision, Occupant, OccupantKind, TileOccupancyTracker};
pub use resolver::{CombatResolution, CombatResolver, MovementScheduler, ResolutionKind};
pub use simulation::{MoveRequest, Simulation};
pub use situation::SituationReport;
pub use spell::{CombatSide, SpellEffect, SpellKind, SpellTargets};
pub use world::World;

// Grid types appear throughout the public API
pub use bastion_grid::{TerrainGrid, TerrainKind, TileCoord};
