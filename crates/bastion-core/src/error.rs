//! Error types for the tactical core.
//!
//! Combat arithmetic has no error type: malformed counts clamp to zero.

use bastion_grid::TileCoord;
use thiserror::Error;

use crate::entity::{FactionId, MoveSource, UnitId};

/// Reasons a move request is rejected.
///
/// A rejected request leaves the world untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// The request asked to move zero units.
    #[error("move request has zero count")]
    ZeroCount,
    /// A tile of the request lies outside the grid.
    #[error("tile {0} is outside the grid")]
    OutOfBounds(TileCoord),
    /// Origin and destination are the same tile.
    #[error("move from {0} targets its own tile")]
    SelfTarget(TileCoord),
    /// The source does not exist at the given origin.
    #[error("no {requested:?} at {from}")]
    UnknownSource {
        /// Requested source.
        requested: MoveSource,
        /// Requested origin.
        from: TileCoord,
    },
    /// The source holds fewer units than requested.
    #[error("requested {requested} units but only {available} available")]
    InsufficientUnits {
        /// Units requested.
        requested: u32,
        /// Units held by the source.
        available: u32,
    },
    /// No route exists to the destination.
    #[error("no route from {from} to {to}")]
    Unreachable {
        /// Origin tile.
        from: TileCoord,
        /// Destination tile.
        to: TileCoord,
    },
    /// The path search ran out of budget.
    #[error("path search from {from} to {to} exhausted its budget")]
    SearchBudgetExhausted {
        /// Origin tile.
        from: TileCoord,
        /// Destination tile.
        to: TileCoord,
    },
}

/// Reasons a placement or world edit is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The tile lies outside the grid.
    #[error("tile {0} is outside the grid")]
    OutOfBounds(TileCoord),
    /// Stacks must hold at least one unit.
    #[error("cannot place an empty stack")]
    EmptyStack,
    /// A castle already stands on the tile.
    #[error("a castle already stands at {0}")]
    CastleExists(TileCoord),
    /// No castle stands on the tile.
    #[error("no castle at {0}")]
    NoCastle(TileCoord),
}

/// Inconsistencies between the occupancy index and the entities it tracks.
///
/// These indicate a tracking bug, never a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// An entity is missing from the occupancy index.
    #[error("unit {0} is not tracked")]
    UntrackedUnit(UnitId),
    /// The index records a different tile than the entity holds.
    #[error("unit {unit} indexed at {indexed} but stands at {actual}")]
    TileMismatch {
        /// Affected unit.
        unit: UnitId,
        /// Tile recorded in the index.
        indexed: TileCoord,
        /// Tile held by the entity.
        actual: TileCoord,
    },
    /// The index holds a unit that no longer exists.
    #[error("index holds unknown unit {0}")]
    OrphanedEntry(UnitId),
    /// Two stacks of one faction share a tile.
    #[error("faction {faction} has more than one stack at {tile}")]
    DuplicateStack {
        /// Shared tile.
        tile: TileCoord,
        /// Faction with duplicate stacks.
        faction: FactionId,
    },
    /// A stack holds no units.
    #[error("stack {0} is empty")]
    EmptyStack(UnitId),
    /// The index records a stack as in transit or a transit unit as
    /// stationary.
    #[error("unit {0} is indexed with the wrong occupant kind")]
    KindMismatch(UnitId),
    /// The index disagrees with a castle's owner.
    #[error("garrison at {0} is not indexed under its owner")]
    GarrisonMismatch(TileCoord),
}

/// Invalid simulation configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Base time per tile must be positive and finite.
    #[error("base time per tile must be positive, got {0}")]
    NonPositiveTileTime(f64),
    /// Unit speeds must be positive and finite.
    #[error("speed for {kind} must be positive, got {speed}")]
    NonPositiveSpeed {
        /// Unit type name.
        kind: String,
        /// Offending speed.
        speed: f64,
    },
    /// The search budget allows no work at all.
    #[error("path search budget is zero")]
    ZeroSearchBudget,
}
