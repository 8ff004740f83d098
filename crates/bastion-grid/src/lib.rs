//! # Bastion Grid
//!
//! Spatial substrate for the Bastion tactical core.
//!
//! The grid crate owns everything that is a pure function of the map:
//!
//! - **Coordinates**: [`TileCoord`], 4-directional adjacency, Manhattan distance
//! - **Terrain**: [`TerrainKind`] and the static [`TerrainModel`] lookup of
//!   passability, movement modifier and combat modifier
//! - **Grid**: [`TerrainGrid`], a dense terrain snapshot with castle markers
//! - **Pathfinding**: [`Pathfinder`], A* over the grid with terrain-weighted
//!   hop costs and a bounded search budget
//! - **Generation**: [`MapGenerator`], seeded deterministic terrain layouts
//!
//! Nothing in this crate knows about factions or units; the core crate layers
//! occupancy, movement and combat on top of it.
//!
//! ## Quick Start
//!
//! ```
//! use bastion_grid::{Pathfinder, TerrainGrid, TerrainKind, TileCoord};
//!
//! let mut grid = TerrainGrid::filled(5, 5, TerrainKind::Grassland).unwrap();
//! grid.set_terrain(TileCoord::new(1, 1), TerrainKind::Mountain).unwrap();
//!
//! let path = Pathfinder::new(&grid).find_path(TileCoord::new(0, 0), TileCoord::new(2, 2));
//! assert!(path.is_found());
//! assert!(!path.steps().contains(&TileCoord::new(1, 1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod coord;
pub mod generate;
pub mod grid;
pub mod pathfinding;
pub mod terrain;

// Re-exports for convenience
pub use coord::TileCoord;
pub use generate::MapGenerator;
pub use grid::{GridError, TerrainGrid};
pub use pathfinding::{Path, Pathfinder, SearchBudget, SearchOutcome};
pub use terrain::{TerrainKind, TerrainModel, TerrainProfile};
