//! Tile coordinates and 4-directional adjacency.

use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Offsets of the four cardinal neighbours, in expansion order.
const CARDINALS: [IVec2; 4] = [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y];

/// Integer coordinates of one grid tile.
///
/// Coordinates are ordered by `x` then `y`, which gives every map keyed by
/// `TileCoord` a deterministic iteration order.
///
/// # Example
///
/// ```
/// use bastion_grid::TileCoord;
///
/// let a = TileCoord::new(0, 0);
/// let b = TileCoord::new(3, 1);
///
/// assert_eq!(a.manhattan(b), 4);
/// assert!(a.is_adjacent(TileCoord::new(0, 1)));
/// ```
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Column, growing to the east.
    pub x: i32,
    /// Row, growing to the south.
    pub y: i32,
}

impl TileCoord {
    /// Creates a coordinate from its components.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the coordinate as a `glam` vector.
    #[must_use]
    pub const fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }

    /// Manhattan distance to `other`.
    #[must_use]
    pub fn manhattan(self, other: Self) -> u32 {
        let delta = (self.as_ivec2() - other.as_ivec2()).abs();
        delta.x.unsigned_abs() + delta.y.unsigned_abs()
    }

    /// Returns `true` if `other` shares an edge with this tile.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.manhattan(other) == 1
    }

    /// The four edge-sharing neighbours, east, west, south, north.
    ///
    /// Neighbours are not bounds-checked; callers filter against their grid.
    #[must_use]
    pub fn neighbors(self) -> [Self; 4] {
        let origin = self.as_ivec2();
        CARDINALS.map(|offset| Self::from(origin + offset))
    }
}

impl From<IVec2> for TileCoord {
    fn from(v: IVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<TileCoord> for IVec2 {
    fn from(c: TileCoord) -> Self {
        c.as_ivec2()
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Debug for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
