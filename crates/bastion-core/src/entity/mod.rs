//! Entity types for the tactical core.
//!
//! This module provides the participants of movement and combat:
//! - [`FactionId`] and [`UnitId`]: identifiers
//! - [`UnitStack`]: stationary units of one faction on one tile
//! - [`Castle`]: a fortified tile with an owner and a garrison
//! - [`TransitUnit`]: units moving along a computed path
//!
//! Move requests name their origin with an explicit [`MoveSource`] variant
//! so the core can match on it exhaustively.
//!
//! # Example
//!
//! ```
//! use bastion_core::entity::{Castle, FactionId, UnitId, UnitKind, UnitStack};
//! use bastion_grid::TileCoord;
//!
//! let stack = UnitStack::new(UnitId::new(1), FactionId::new(0), TileCoord::new(2, 3), 12)
//!     .with_kind(UnitKind::Cavalry);
//! assert_eq!(stack.count, 12);
//!
//! let castle = Castle::new(TileCoord::new(4, 4), FactionId::new(1), 20);
//! assert_eq!(castle.capacity, 100);
//! ```

mod transit;

use std::fmt;

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};

pub use transit::{MovementState, TransitUnit};

/// Garrison capacity given to castles that do not specify one.
pub const DEFAULT_GARRISON_CAPACITY: u32 = 100;

// =============================================================================
// Identifiers
// =============================================================================

/// Identifier of a faction.
///
/// Factions are ordered by their numeric value. Combat ties between factions
/// of exactly equal strength go to the lowest identifier.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(u32);

impl FactionId {
    /// Creates a faction identifier from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactionId({})", self.0)
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FactionId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Identifier of a unit stack or transit unit.
///
/// Identifiers are allocated monotonically by the world and never reused.
/// A transit unit that settles onto an empty tile keeps its identifier as
/// the new stack's identifier.
///
/// # Example
///
/// ```
/// use bastion_core::entity::UnitId;
///
/// let a = UnitId::new(1);
/// let b = UnitId::new(2);
/// assert!(a < b);
/// assert_eq!(u64::from(b), 2);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(u64);

impl UnitId {
    /// Creates a unit identifier from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitId({})", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UnitId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<UnitId> for u64 {
    fn from(id: UnitId) -> Self {
        id.0
    }
}

// =============================================================================
// Units
// =============================================================================

/// Unit type metadata. Selects the base movement speed.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Foot soldiers.
    #[default]
    Infantry,
    /// Mounted troops.
    Cavalry,
    /// Siege engines.
    Siege,
}

/// Stationary units of one faction on one tile.
///
/// A tile holds at most one stack per faction; the world merges same-faction
/// stacks on placement and on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStack {
    /// Stack identifier.
    pub id: UnitId,
    /// Owning faction.
    pub faction: FactionId,
    /// Tile the stack stands on.
    pub tile: TileCoord,
    /// Number of units.
    pub count: u32,
    /// Unit type.
    pub kind: UnitKind,
    /// Veterancy level.
    pub level: u8,
}

impl UnitStack {
    /// Creates an infantry stack at level 0.
    #[must_use]
    pub fn new(id: UnitId, faction: FactionId, tile: TileCoord, count: u32) -> Self {
        Self {
            id,
            faction,
            tile,
            count,
            kind: UnitKind::default(),
            level: 0,
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
}

// =============================================================================
// Castles
// =============================================================================

/// A fortified tile.
///
/// Castles are never destroyed, only re-owned. The garrison is counted
/// separately from any stacks standing on the castle's tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Castle {
    /// Location of the castle.
    pub tile: TileCoord,
    /// Current owner.
    pub owner: FactionId,
    /// Garrison strength.
    pub garrison: u32,
    /// Largest garrison a capturing faction may install.
    pub capacity: u32,
    /// Multiplier applied to the garrison's combat contribution.
    pub defense: f32,
}

impl Castle {
    /// Creates a castle with the default capacity and neutral defense.
    #[must_use]
    pub fn new(tile: TileCoord, owner: FactionId, garrison: u32) -> Self {
        Self {
            tile,
            owner,
            garrison,
            capacity: DEFAULT_GARRISON_CAPACITY.max(garrison),
            defense: 1.0,
        }
    }

    /// Sets the capacity, builder style.
    ///
    /// Capacity never drops below the current garrison or below one.
    #[must_use]
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity.max(self.garrison).max(1);
        self
    }

    /// Sets the defense modifier, builder style. Negative values clamp to zero.
    #[must_use]
    pub fn with_defense(mut self, defense: f32) -> Self {
        self.defense = defense.max(0.0);
        self
    }
}

// =============================================================================
// Move Sources
// =============================================================================

/// Where the units of a move request come from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveSource {
    /// Detach units from a stationary stack.
    Stack(UnitId),
    /// Send units out of a castle's garrison.
    Garrison(TileCoord),
}
