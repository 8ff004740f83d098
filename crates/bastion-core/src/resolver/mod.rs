//! Resolvers that mutate the world during a step.
//!
//! Movement and combat are the two writers of simulation state:
//!
//! 1. The [`MovementScheduler`] advances transit units and updates occupancy
//!    as they enter tiles
//! 2. Whenever a unit reaches its destination or runs into a foreign presence,
//!    the scheduler hands the tile to the [`CombatResolver`], which merges or
//!    fights synchronously before the step continues
//!
//! # Invariants
//!
//! - A tile is never left half-resolved at the end of a step
//! - Both resolvers iterate in id order, so identical inputs give identical
//!   results
//!
//! # Available Resolvers
//!
//! - [`MovementScheduler`]: per-tick progress, interception and arrival
//! - [`CombatResolver`]: merges, skirmishes and two-phase sieges

mod combat;
mod movement;

pub use combat::{
    ArrivalFate, CastleDefense, CastleOutcome, CombatInput, CombatResolution, CombatResolver,
    Combatant, FactionOutcome, ResolutionKind, TileResolution,
};
pub use movement::MovementScheduler;
