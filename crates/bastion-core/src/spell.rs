//! Queued spell effects applied before a combat comparison.
//!
//! Spells are queued per tile and consumed by the next contested resolution
//! on that tile, whatever its outcome.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Sides of a combat a spell applies to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SpellTargets: u8 {
        /// Factions arriving on the tile.
        const ATTACKER = 0b01;
        /// Factions already holding the tile.
        const DEFENDER = 0b10;
        /// Both sides.
        const BOTH = Self::ATTACKER.bits() | Self::DEFENDER.bits();
    }
}

/// Side of a combat a faction fights on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CombatSide {
    /// Arrived on the tile this step.
    Attacker,
    /// Held the tile with a stack or castle garrison.
    Defender,
}

impl CombatSide {
    /// Target flag matching this side.
    #[must_use]
    pub fn targets(self) -> SpellTargets {
        match self {
            Self::Attacker => SpellTargets::ATTACKER,
            Self::Defender => SpellTargets::DEFENDER,
        }
    }
}

/// What a spell does to effective power.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpellKind {
    /// Subtracts a flat amount of power.
    Damage(f32),
    /// Adds a flat amount of power.
    Heal(f32),
    /// Multiplies power.
    Buff(f32),
}

/// A spell waiting on a tile.
///
/// # Example
///
/// ```
/// use bastion_core::spell::{CombatSide, SpellEffect, SpellTargets};
///
/// let curse = SpellEffect::damage(3.0, SpellTargets::DEFENDER);
/// assert!((curse.apply(10.0, CombatSide::Defender) - 7.0).abs() < 1e-9);
/// assert!((curse.apply(10.0, CombatSide::Attacker) - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellEffect {
    /// Effect on power.
    pub kind: SpellKind,
    /// Sides affected.
    pub targets: SpellTargets,
}

impl SpellEffect {
    /// Creates a spell.
    #[must_use]
    pub fn new(kind: SpellKind, targets: SpellTargets) -> Self {
        Self { kind, targets }
    }

    /// Flat damage spell.
    #[must_use]
    pub fn damage(amount: f32, targets: SpellTargets) -> Self {
        Self::new(SpellKind::Damage(amount), targets)
    }

    /// Flat heal spell.
    #[must_use]
    pub fn heal(amount: f32, targets: SpellTargets) -> Self {
        Self::new(SpellKind::Heal(amount), targets)
    }

    /// Multiplicative buff spell.
    #[must_use]
    pub fn buff(factor: f32, targets: SpellTargets) -> Self {
        Self::new(SpellKind::Buff(factor), targets)
    }

    /// Returns `true` if the spell affects `side`.
    #[must_use]
    pub fn affects(&self, side: CombatSide) -> bool {
        self.targets.contains(side.targets())
    }

    /// Applies the spell to one side's power. Power never drops below zero.
    #[must_use]
    pub fn apply(&self, power: f64, side: CombatSide) -> f64 {
        if !self.affects(side) {
            return power;
        }
        let adjusted = match self.kind {
            SpellKind::Damage(amount) => power - f64::from(amount),
            SpellKind::Heal(amount) => power + f64::from(amount),
            SpellKind::Buff(factor) => power * f64::from(factor),
        };
        adjusted.max(0.0)
    }
}

/// Applies a queue of spells in order.
#[must_use]
pub fn apply_all(spells: &[SpellEffect], power: f64, side: CombatSide) -> f64 {
    spells.iter().fold(power, |acc, spell| spell.apply(acc, side))
}
