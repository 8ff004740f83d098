//! Dense terrain snapshot of the battlefield.
//!
//! A [`TerrainGrid`] stores one [`TerrainKind`] per tile in row-major order,
//! the [`TerrainModel`] used to interpret it, and the set of castle tiles.
//! Castle tiles are marked as siege targets: a path may end on one even when
//! its terrain is otherwise impassable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::TileCoord;
use crate::terrain::{TerrainKind, TerrainModel, TerrainProfile};

/// Errors raised while building or editing a grid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Width or height was zero or negative.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    InvalidDimensions {
        /// Requested width
        width: i32,
        /// Requested height
        height: i32,
    },
    /// The tile vector does not match `width * height`.
    #[error("expected {expected} tiles for the grid, got {actual}")]
    TileCountMismatch {
        /// `width * height`
        expected: usize,
        /// Length of the supplied tile vector
        actual: usize,
    },
    /// A coordinate fell outside the grid.
    #[error("tile {0} is outside the grid")]
    OutOfBounds(TileCoord),
}

/// Terrain snapshot with castle markers.
///
/// # Example
///
/// ```
/// use bastion_grid::{TerrainGrid, TerrainKind, TileCoord};
///
/// let mut grid = TerrainGrid::filled(3, 2, TerrainKind::Grassland).unwrap();
/// grid.set_terrain(TileCoord::new(2, 1), TerrainKind::Mountain).unwrap();
///
/// assert_eq!(grid.terrain(TileCoord::new(2, 1)), Some(TerrainKind::Mountain));
/// assert_eq!(grid.terrain(TileCoord::new(3, 0)), None);
/// assert_eq!(grid.movement_modifier_at(TileCoord::new(2, 1)), None);
///
/// grid.mark_siege_target(TileCoord::new(2, 1)).unwrap();
/// assert_eq!(grid.approach_modifier_at(TileCoord::new(2, 1)), Some(1.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: i32,
    height: i32,
    /// Row-major terrain, `width * height` entries.
    tiles: Vec<TerrainKind>,
    siege_targets: BTreeSet<TileCoord>,
    model: TerrainModel,
}

impl TerrainGrid {
    /// Creates a grid where every tile has the same terrain.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] if either dimension is not positive.
    pub fn filled(width: i32, height: i32, terrain: TerrainKind) -> Result<Self, GridError> {
        let len = Self::checked_len(width, height)?;
        Self::from_tiles(width, height, vec![terrain; len])
    }

    /// Creates a grid from row-major terrain.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] for non-positive dimensions and
    /// [`GridError::TileCountMismatch`] if `tiles.len() != width * height`.
    pub fn from_tiles(width: i32, height: i32, tiles: Vec<TerrainKind>) -> Result<Self, GridError> {
        let expected = Self::checked_len(width, height)?;
        if tiles.len() != expected {
            return Err(GridError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
            siege_targets: BTreeSet::new(),
            model: TerrainModel::default(),
        })
    }

    fn checked_len(width: i32, height: i32) -> Result<usize, GridError> {
        match (usize::try_from(width), usize::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok(w * h),
            _ => Err(GridError::InvalidDimensions { width, height }),
        }
    }

    /// Replaces the terrain model, builder style.
    #[must_use]
    pub fn with_model(mut self, model: TerrainModel) -> Self {
        self.model = model;
        self
    }

    /// Replaces the terrain model.
    pub fn set_model(&mut self, model: TerrainModel) {
        self.model = model;
    }

    /// The terrain model used to interpret tiles.
    #[must_use]
    pub fn model(&self) -> &TerrainModel {
        &self.model
    }

    /// Grid width in tiles.
    #[must_use]
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always `false`; a grid has at least one tile.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Returns `true` if `coord` lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, coord: TileCoord) -> bool {
        (0..self.width).contains(&coord.x) && (0..self.height).contains(&coord.y)
    }

    /// Row-major index of `coord`, or `None` outside the grid.
    #[must_use]
    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        let x = usize::try_from(coord.x).ok()?;
        let y = usize::try_from(coord.y).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(y * width + x)
    }

    /// Coordinate of a row-major index.
    #[must_use]
    pub fn coord_of(&self, index: usize) -> Option<TileCoord> {
        if index >= self.tiles.len() {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = i32::try_from(index % width).ok()?;
        let y = i32::try_from(index / width).ok()?;
        Some(TileCoord::new(x, y))
    }

    /// Iterates all coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| TileCoord::new(x, y)))
    }

    /// Terrain at `coord`, or `None` outside the grid.
    #[must_use]
    pub fn terrain(&self, coord: TileCoord) -> Option<TerrainKind> {
        self.index_of(coord).map(|i| self.tiles[i])
    }

    /// Changes the terrain of one tile.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `coord` is outside the grid.
    pub fn set_terrain(&mut self, coord: TileCoord, terrain: TerrainKind) -> Result<(), GridError> {
        let index = self.index_of(coord).ok_or(GridError::OutOfBounds(coord))?;
        self.tiles[index] = terrain;
        Ok(())
    }

    /// Marks a tile as a castle that armies may besiege.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::OutOfBounds`] if `coord` is outside the grid.
    pub fn mark_siege_target(&mut self, coord: TileCoord) -> Result<(), GridError> {
        if !self.in_bounds(coord) {
            return Err(GridError::OutOfBounds(coord));
        }
        self.siege_targets.insert(coord);
        Ok(())
    }

    /// Returns `true` if the tile holds a castle.
    #[must_use]
    pub fn is_siege_target(&self, coord: TileCoord) -> bool {
        self.siege_targets.contains(&coord)
    }

    /// Terrain profile at `coord`.
    #[must_use]
    pub fn profile_at(&self, coord: TileCoord) -> Option<TerrainProfile> {
        self.terrain(coord).map(|kind| self.model.profile(kind))
    }

    /// Movement modifier for entering `coord`, or `None` if it cannot be entered.
    #[must_use]
    pub fn movement_modifier_at(&self, coord: TileCoord) -> Option<f32> {
        self.terrain(coord)
            .and_then(|kind| self.model.movement_modifier(kind))
    }

    /// Movement modifier for entering `coord` as the end of a march.
    ///
    /// Identical to [`movement_modifier_at`](Self::movement_modifier_at) except
    /// that an impassable castle tile is approached at the neutral modifier.
    #[must_use]
    pub fn approach_modifier_at(&self, coord: TileCoord) -> Option<f32> {
        self.movement_modifier_at(coord)
            .or_else(|| self.is_siege_target(coord).then_some(1.0))
    }

    /// Combat modifier at `coord`; neutral outside the grid.
    #[must_use]
    pub fn combat_modifier_at(&self, coord: TileCoord) -> f32 {
        self.terrain(coord)
            .map_or(1.0, |kind| self.model.combat_modifier(kind))
    }

    /// Raw row-major terrain slice.
    #[must_use]
    pub fn tiles(&self) -> &[TerrainKind] {
        &self.tiles
    }
}
