//! Terrain kinds and the static terrain lookup table.
//!
//! The [`TerrainModel`] answers three questions about a terrain kind:
//! can it be entered, how fast is it crossed, and how does it shift combat.
//! Lookups never fail; a kind missing from a custom table resolves to
//! [`TerrainProfile::NEUTRAL`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Terrain Kind
// =============================================================================

/// Terrain classification of a single tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Open ground, the neutral reference terrain.
    Grassland,
    /// Built road, fast to cross and poor to defend.
    Road,
    /// Woodland, slow and defensible.
    Forest,
    /// Broken high ground.
    Hills,
    /// Marsh, very slow.
    Swamp,
    /// Arid flats.
    Desert,
    /// Impassable peaks.
    Mountain,
    /// Impassable open water.
    Water,
}

impl TerrainKind {
    /// Every terrain kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Grassland,
        Self::Road,
        Self::Forest,
        Self::Hills,
        Self::Swamp,
        Self::Desert,
        Self::Mountain,
        Self::Water,
    ];

    /// Lower-case name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Grassland => "grassland",
            Self::Road => "road",
            Self::Forest => "forest",
            Self::Hills => "hills",
            Self::Swamp => "swamp",
            Self::Desert => "desert",
            Self::Mountain => "mountain",
            Self::Water => "water",
        }
    }

    /// Parses a terrain name, ignoring case. Unknown names yield `None`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for TerrainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Terrain Profile
// =============================================================================

/// Movement and combat properties of one terrain kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainProfile {
    /// Explicit passability flag.
    pub passable: bool,
    /// Speed multiplier while entering a tile; `0` means the tile cannot be entered.
    pub movement_modifier: f32,
    /// Multiplier on defender strength; `1.0` is neutral.
    pub combat_modifier: f32,
}

impl TerrainProfile {
    /// Passable, unmodified terrain.
    pub const NEUTRAL: Self = Self::new(true, 1.0, 1.0);

    /// Creates a profile.
    #[must_use]
    pub const fn new(passable: bool, movement_modifier: f32, combat_modifier: f32) -> Self {
        Self {
            passable,
            movement_modifier,
            combat_modifier,
        }
    }

    /// Creates an impassable profile with the given combat modifier.
    #[must_use]
    pub const fn impassable(combat_modifier: f32) -> Self {
        Self::new(false, 0.0, combat_modifier)
    }

    /// Returns `true` if units may enter a tile with this profile.
    ///
    /// Both the explicit flag and a non-positive modifier block entry.
    #[must_use]
    pub fn can_enter(&self) -> bool {
        self.passable && self.movement_modifier > 0.0
    }
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

// =============================================================================
// Terrain Model
// =============================================================================

/// Static lookup of per-terrain passability and modifiers.
///
/// # Example
///
/// ```
/// use bastion_grid::{TerrainKind, TerrainModel};
///
/// let model = TerrainModel::default();
/// assert_eq!(model.cost(TerrainKind::Road), Some(0.5));
/// assert_eq!(model.cost(TerrainKind::Swamp), Some(2.0));
/// assert_eq!(model.cost(TerrainKind::Mountain), None);
/// assert!((model.combat_modifier(TerrainKind::Grassland) - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainModel {
    profiles: BTreeMap<TerrainKind, TerrainProfile>,
}

impl TerrainModel {
    /// Creates a model with no entries; every lookup returns the neutral profile.
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }

    /// Builder-style variant of [`set_profile`](Self::set_profile).
    #[must_use]
    pub fn with_profile(mut self, kind: TerrainKind, profile: TerrainProfile) -> Self {
        self.set_profile(kind, profile);
        self
    }

    /// Overrides the profile of one terrain kind.
    pub fn set_profile(&mut self, kind: TerrainKind, profile: TerrainProfile) {
        self.profiles.insert(kind, profile);
    }

    /// Profile of a terrain kind, or [`TerrainProfile::NEUTRAL`] if the table has none.
    #[must_use]
    pub fn profile(&self, kind: TerrainKind) -> TerrainProfile {
        self.profiles.get(&kind).copied().unwrap_or_default()
    }

    /// Returns `true` if units may enter terrain of this kind.
    #[must_use]
    pub fn is_passable(&self, kind: TerrainKind) -> bool {
        self.profile(kind).can_enter()
    }

    /// Movement modifier, or `None` when the terrain cannot be entered.
    #[must_use]
    pub fn movement_modifier(&self, kind: TerrainKind) -> Option<f32> {
        let profile = self.profile(kind);
        profile.can_enter().then_some(profile.movement_modifier)
    }

    /// Cost of one hop into terrain of this kind: `1 / movement_modifier`.
    ///
    /// Returns `None` for impassable terrain.
    #[must_use]
    pub fn cost(&self, kind: TerrainKind) -> Option<f32> {
        self.movement_modifier(kind).map(|modifier| 1.0 / modifier)
    }

    /// Combat modifier of the terrain (`1.0` is neutral).
    #[must_use]
    pub fn combat_modifier(&self, kind: TerrainKind) -> f32 {
        self.profile(kind).combat_modifier
    }

    /// Cheapest hop cost any terrain kind allows.
    ///
    /// Used to scale the A* heuristic so it stays admissible when some terrain
    /// is faster than the neutral reference.
    #[must_use]
    pub fn min_hop_cost(&self) -> f32 {
        let fastest = TerrainKind::ALL
            .into_iter()
            .filter_map(|kind| self.movement_modifier(kind))
            .fold(1.0_f32, f32::max);
        1.0 / fastest
    }
}

impl Default for TerrainModel {
    fn default() -> Self {
        Self::neutral()
            .with_profile(TerrainKind::Grassland, TerrainProfile::NEUTRAL)
            .with_profile(TerrainKind::Road, TerrainProfile::new(true, 2.0, 0.9))
            .with_profile(TerrainKind::Forest, TerrainProfile::new(true, 0.75, 1.25))
            .with_profile(TerrainKind::Hills, TerrainProfile::new(true, 0.6, 1.5))
            .with_profile(TerrainKind::Swamp, TerrainProfile::new(true, 0.5, 0.8))
            .with_profile(TerrainKind::Desert, TerrainProfile::new(true, 0.8, 1.0))
            .with_profile(TerrainKind::Mountain, TerrainProfile::impassable(2.0))
            .with_profile(TerrainKind::Water, TerrainProfile::impassable(1.0))
    }
}
