//! Seeded terrain generation.
//!
//! Layouts are drawn tile by tile from a weighted terrain distribution using
//! a ChaCha8 stream, so the same seed and weights always produce the same map
//! on every platform.

use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::grid::{GridError, TerrainGrid};
use crate::terrain::TerrainKind;

/// Deterministic random map generator.
///
/// # Example
///
/// ```
/// use bastion_grid::MapGenerator;
///
/// let a = MapGenerator::new(7).generate(16, 16).unwrap();
/// let b = MapGenerator::new(7).generate(16, 16).unwrap();
/// assert_eq!(a.tiles(), b.tiles());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapGenerator {
    seed: u64,
    weights: Vec<(TerrainKind, u32)>,
}

impl MapGenerator {
    /// Creates a generator with a mostly open default terrain mix.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            weights: vec![
                (TerrainKind::Grassland, 50),
                (TerrainKind::Road, 8),
                (TerrainKind::Forest, 15),
                (TerrainKind::Hills, 8),
                (TerrainKind::Swamp, 5),
                (TerrainKind::Desert, 6),
                (TerrainKind::Mountain, 5),
                (TerrainKind::Water, 3),
            ],
        }
    }

    /// Replaces the terrain mix.
    ///
    /// Kinds absent from `weights` never appear. If every weight is zero the
    /// generator falls back to plain grassland.
    #[must_use]
    pub fn with_weights(mut self, weights: Vec<(TerrainKind, u32)>) -> Self {
        self.weights = weights;
        self
    }

    /// Seed of the generator.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generates a `width` × `height` grid.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidDimensions`] for non-positive dimensions.
    pub fn generate(&self, width: i32, height: i32) -> Result<TerrainGrid, GridError> {
        let mut grid = TerrainGrid::filled(width, height, TerrainKind::Grassland)?;

        let distribution = match WeightedIndex::new(self.weights.iter().map(|&(_, w)| w)) {
            Ok(distribution) => distribution,
            Err(err) => {
                warn!(seed = self.seed, %err, "unusable terrain weights, generating grassland");
                return Ok(grid);
            }
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let coords: Vec<_> = grid.coords().collect();
        for coord in coords {
            let kind = self.weights[distribution.sample(&mut rng)].0;
            grid.set_terrain(coord, kind)?;
        }

        debug!(seed = self.seed, width, height, "generated terrain");
        Ok(grid)
    }
}
