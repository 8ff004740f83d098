//! Combat resolver for contested tiles.
//!
//! The `CombatResolver` handles:
//! - Merges: a tile with a single faction combines its units into one stack,
//!   or into the garrison of that faction's castle
//! - Skirmishes: several factions on an open tile
//! - Sieges: foreign factions against a castle, with an optional first phase
//!   against the owner's reinforcements standing on the castle tile
//!
//! # Strength
//!
//! Effective power is unit count times a side modifier. Factions already
//! holding the tile (a stack or the castle) defend and are multiplied by the
//! tile's terrain combat modifier; the garrison additionally by the castle's
//! defense. Arriving factions attack at 1.0. Queued spells adjust each
//! faction's power before the first comparison of a resolution.
//!
//! Power is converted back into units proportionally and rounded down, so
//! with neutral modifiers the arithmetic is plain integer subtraction.
//!
//! # Ties
//!
//! Among factions with exactly equal greatest power the lowest `FactionId`
//! wins. Factions with no units never win.
//!
//! # Failure Policy
//!
//! Resolution never fails. Negative counts clamp to zero.

use std::collections::{BTreeMap, BTreeSet};

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entity::{Castle, FactionId, TransitUnit, UnitId, UnitStack};
use crate::event::SimEvent;
use crate::spell::{apply_all, CombatSide, SpellEffect};
use crate::world::World;

// =============================================================================
// Input
// =============================================================================

/// One faction's units entering a resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Faction.
    pub faction: FactionId,
    /// Units, never negative.
    pub units: u32,
    /// Side the faction fights on.
    pub side: CombatSide,
}

impl Combatant {
    /// Creates a combatant, clamping negative counts to zero.
    #[must_use]
    pub fn new(faction: FactionId, units: i64, side: CombatSide) -> Self {
        Self {
            faction,
            units: clamp_count(units),
            side,
        }
    }
}

/// The castle on a contested tile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastleDefense {
    /// Current owner.
    pub owner: FactionId,
    /// Garrison strength.
    pub garrison: u32,
    /// Largest garrison a capturing faction may install.
    pub capacity: u32,
    /// Garrison power multiplier.
    pub defense: f32,
}

impl From<&Castle> for CastleDefense {
    fn from(castle: &Castle) -> Self {
        Self {
            owner: castle.owner,
            garrison: castle.garrison,
            capacity: castle.capacity,
            defense: castle.defense,
        }
    }
}

/// Everything a resolution depends on.
///
/// Combatants naming the same faction are summed; a faction defends if any
/// of its entries defends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatInput {
    /// Tile being resolved.
    pub tile: TileCoord,
    /// Terrain combat modifier of the tile.
    pub terrain_modifier: f32,
    /// Castle on the tile.
    pub castle: Option<CastleDefense>,
    /// Units present.
    pub combatants: Vec<Combatant>,
    /// Spells to apply before the first comparison.
    pub spells: Vec<SpellEffect>,
}

impl CombatInput {
    /// Creates an input with no participants.
    #[must_use]
    pub fn new(tile: TileCoord, terrain_modifier: f32) -> Self {
        Self {
            tile,
            terrain_modifier,
            castle: None,
            combatants: Vec::new(),
            spells: Vec::new(),
        }
    }

    /// Adds a castle, builder style.
    #[must_use]
    pub fn with_castle(mut self, castle: CastleDefense) -> Self {
        self.castle = Some(castle);
        self
    }

    /// Adds a combatant, builder style.
    #[must_use]
    pub fn with_combatant(mut self, combatant: Combatant) -> Self {
        self.combatants.push(combatant);
        self
    }

    /// Adds spells, builder style.
    #[must_use]
    pub fn with_spells(mut self, spells: Vec<SpellEffect>) -> Self {
        self.spells = spells;
        self
    }
}

// =============================================================================
// Output
// =============================================================================

/// Which rule set resolved the tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionKind {
    /// Single faction; units combined, nothing fought.
    Merge,
    /// Several factions on an open tile.
    Skirmish,
    /// Foreign factions against a castle garrison.
    Siege,
    /// The owner's reinforcements beat the attackers outright.
    ReinforcementsHeld,
    /// The attackers broke the reinforcements and then fought the garrison.
    ReinforcementsBroken,
}

/// Result for one faction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionOutcome {
    /// Faction.
    pub faction: FactionId,
    /// Units before resolution, garrison included.
    pub initial_strength: u32,
    /// Whether any units remain on the tile.
    pub survived: bool,
    /// Units after resolution, garrison included.
    pub final_strength: u32,
}

/// Result for the castle on the tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastleOutcome {
    /// Castle tile.
    pub tile: TileCoord,
    /// Owner before resolution.
    pub previous_owner: FactionId,
    /// Owner after resolution.
    pub owner: FactionId,
    /// Whether ownership changed.
    pub captured: bool,
    /// Garrison after resolution.
    pub garrison: u32,
}

/// Full outcome of resolving one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatResolution {
    /// Resolved tile.
    pub tile: TileCoord,
    /// Rule set used.
    pub kind: ResolutionKind,
    /// Per-faction results, in faction order.
    pub outcomes: Vec<FactionOutcome>,
    /// Faction holding the tile afterwards.
    pub winner: Option<FactionId>,
    /// Units the winner holds on the tile afterwards.
    pub survivors: u32,
    /// Castle result, if a castle stands on the tile.
    pub castle: Option<CastleOutcome>,
    /// Number of spells consumed.
    pub spells_applied: usize,
}

impl CombatResolution {
    /// Returns `true` unless the tile was a single-faction merge.
    #[must_use]
    pub fn is_contested(&self) -> bool {
        self.kind != ResolutionKind::Merge
    }

    /// Result for one faction.
    #[must_use]
    pub fn outcome_for(&self, faction: FactionId) -> Option<&FactionOutcome> {
        self.outcomes.iter().find(|outcome| outcome.faction == faction)
    }

    /// Returns `true` if the castle changed hands.
    #[must_use]
    pub fn captured(&self) -> bool {
        self.castle.is_some_and(|castle| castle.captured)
    }
}

/// What became of the unit whose arrival triggered a resolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalFate {
    /// It won and keeps marching with `count` units.
    Continue {
        /// Surviving units.
        count: u32,
    },
    /// It settled on the tile as a stack or into the garrison.
    Settled,
    /// It was wiped out.
    Destroyed,
}

/// A resolution applied to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileResolution {
    /// The outcome.
    pub resolution: CombatResolution,
    /// Fate of the arriving transit unit, when there was one.
    pub arrival: Option<ArrivalFate>,
}

// =============================================================================
// Resolver
// =============================================================================

/// Per-faction force gathered from the input.
#[derive(Debug, Copy, Clone)]
struct Force {
    units: u64,
    side: CombatSide,
}

/// One contender in a strength comparison.
#[derive(Debug, Copy, Clone)]
struct Contender {
    faction: FactionId,
    units: u64,
    power: f64,
}

/// Deterministic resolver for tiles shared by more than one faction.
///
/// # Example
///
/// ```
/// use bastion_core::entity::FactionId;
/// use bastion_core::resolver::{Combatant, CombatInput, CombatResolver};
/// use bastion_core::spell::CombatSide;
/// use bastion_grid::TileCoord;
///
/// let input = CombatInput::new(TileCoord::new(0, 0), 1.0)
///     .with_combatant(Combatant::new(FactionId::new(0), 10, CombatSide::Defender))
///     .with_combatant(Combatant::new(FactionId::new(1), 6, CombatSide::Attacker));
///
/// let resolution = CombatResolver::new().resolve(&input);
/// assert_eq!(resolution.winner, Some(FactionId::new(0)));
/// assert_eq!(resolution.survivors, 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CombatResolver;

impl CombatResolver {
    /// Creates a new combat resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Computes the outcome for `input` without touching any state.
    #[must_use]
    pub fn resolve(&self, input: &CombatInput) -> CombatResolution {
        let forces = gather(input);
        let mut present: BTreeSet<FactionId> = forces
            .iter()
            .filter(|(_, force)| force.units > 0)
            .map(|(&faction, _)| faction)
            .collect();
        present.extend(input.castle.map(|castle| castle.owner));

        if present.len() < 2 {
            return Self::merge(input, &forces);
        }

        match input.castle {
            Some(castle) if forces.get(&castle.owner).is_some_and(|f| f.units > 0) => {
                Self::reinforced_siege(input, &forces, castle)
            }
            Some(castle) => {
                let contenders = Self::contenders(input, &forces, &input.spells);
                Self::contest(input, &forces, Some(castle), contenders, ResolutionKind::Siege)
            }
            None => {
                let contenders = Self::contenders(input, &forces, &input.spells);
                Self::contest(input, &forces, None, contenders, ResolutionKind::Skirmish)
            }
        }
    }

    /// Single-faction tile: everything combines.
    fn merge(input: &CombatInput, forces: &BTreeMap<FactionId, Force>) -> CombatResolution {
        let faction = input
            .castle
            .map(|castle| castle.owner)
            .or_else(|| {
                forces
                    .iter()
                    .find(|(_, force)| force.units > 0)
                    .map(|(&faction, _)| faction)
            });
        let units = faction
            .and_then(|f| forces.get(&f))
            .map_or(0, |force| force.units);
        let garrison = input.castle.map_or(0, |castle| u64::from(castle.garrison));
        let total = saturate(units + garrison);

        let mut outcomes = initial_outcomes(input, forces);
        for outcome in &mut outcomes {
            if Some(outcome.faction) == faction {
                outcome.final_strength = total;
                outcome.survived = total > 0;
            }
        }

        CombatResolution {
            tile: input.tile,
            kind: ResolutionKind::Merge,
            outcomes,
            winner: faction,
            survivors: total,
            castle: input.castle.map(|castle| CastleOutcome {
                tile: input.tile,
                previous_owner: castle.owner,
                owner: castle.owner,
                captured: false,
                garrison: total,
            }),
            spells_applied: 0,
        }
    }

    /// Phase 1 against the owner's reinforcements, then Phase 2 against the
    /// bare castle if they break.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn reinforced_siege(
        input: &CombatInput,
        forces: &BTreeMap<FactionId, Force>,
        castle: CastleDefense,
    ) -> CombatResolution {
        let terrain = terrain_factor(input);
        let reinforcements = forces.get(&castle.owner).map_or(0, |f| f.units);
        let defended = apply_all(
            &input.spells,
            reinforcements as f64 * terrain,
            CombatSide::Defender,
        );

        // Foreign factions attack as one side; spells see the combined total.
        let attackers: Vec<Contender> = forces
            .iter()
            .filter(|(faction, force)| **faction != castle.owner && force.units > 0)
            .map(|(&faction, force)| Contender {
                faction,
                units: force.units,
                power: force.units as f64 * side_factor(force.side, terrain),
            })
            .collect();
        let raw_attack: f64 = attackers.iter().map(|a| a.power).sum();
        let attack = apply_all(&input.spells, raw_attack, CombatSide::Attacker);

        if attack <= defended {
            let kept = units_after(reinforcements, defended, defended - attack);
            let garrison = saturate(u64::from(castle.garrison) + kept);
            let mut outcomes = initial_outcomes(input, forces);
            for outcome in &mut outcomes {
                if outcome.faction == castle.owner {
                    outcome.final_strength = garrison;
                    outcome.survived = garrison > 0;
                }
            }
            return CombatResolution {
                tile: input.tile,
                kind: ResolutionKind::ReinforcementsHeld,
                outcomes,
                winner: Some(castle.owner),
                survivors: garrison,
                castle: Some(CastleOutcome {
                    tile: input.tile,
                    previous_owner: castle.owner,
                    owner: castle.owner,
                    captured: false,
                    garrison,
                }),
                spells_applied: input.spells.len(),
            };
        }

        // Reinforcements are gone. Surviving attack power is shared out in
        // proportion to each attacker's contribution.
        let surviving = attack - defended;
        let mut contenders: Vec<Contender> = attackers
            .iter()
            .map(|a| {
                let units = ((a.units as f64 * surviving / attack).floor() as u64).min(a.units);
                Contender {
                    faction: a.faction,
                    units,
                    power: units as f64,
                }
            })
            .collect();
        contenders.push(Contender {
            faction: castle.owner,
            units: u64::from(castle.garrison),
            power: garrison_power(castle, terrain),
        });

        let mut resolution = Self::contest(
            input,
            forces,
            Some(castle),
            contenders,
            ResolutionKind::ReinforcementsBroken,
        );
        resolution.spells_applied = input.spells.len();
        resolution
    }

    /// Effective power of every faction for a Phase 2 comparison.
    #[allow(clippy::cast_precision_loss)]
    fn contenders(
        input: &CombatInput,
        forces: &BTreeMap<FactionId, Force>,
        spells: &[SpellEffect],
    ) -> Vec<Contender> {
        let terrain = terrain_factor(input);
        let mut contenders: Vec<Contender> = forces
            .iter()
            .filter(|(_, force)| force.units > 0)
            .map(|(&faction, force)| Contender {
                faction,
                units: force.units,
                power: apply_all(
                    spells,
                    force.units as f64 * side_factor(force.side, terrain),
                    force.side,
                ),
            })
            .collect();

        if let Some(castle) = input.castle {
            let garrison = apply_all(spells, garrison_power(castle, terrain), CombatSide::Defender);
            match contenders.iter_mut().find(|c| c.faction == castle.owner) {
                Some(owner) => {
                    owner.units += u64::from(castle.garrison);
                    owner.power += garrison;
                }
                None => contenders.push(Contender {
                    faction: castle.owner,
                    units: u64::from(castle.garrison),
                    power: garrison,
                }),
            }
        }
        contenders.sort_by_key(|c| c.faction);
        contenders
    }

    /// Phase 2: the strongest faction takes the tile.
    fn contest(
        input: &CombatInput,
        forces: &BTreeMap<FactionId, Force>,
        castle: Option<CastleDefense>,
        mut contenders: Vec<Contender>,
        kind: ResolutionKind,
    ) -> CombatResolution {
        contenders.sort_by_key(|c| c.faction);

        let mut best: Option<Contender> = None;
        for contender in contenders.iter().filter(|c| c.units > 0) {
            // Strictly greater, so the lowest faction keeps a tie.
            if best.map_or(true, |b| contender.power > b.power) {
                best = Some(*contender);
            }
        }

        let mut outcomes = initial_outcomes(input, forces);
        let spells_applied = if kind == ResolutionKind::ReinforcementsBroken {
            0
        } else {
            input.spells.len()
        };

        let Some(winner) = best else {
            return CombatResolution {
                tile: input.tile,
                kind,
                outcomes,
                winner: None,
                survivors: 0,
                castle: castle.map(|c| CastleOutcome {
                    tile: input.tile,
                    previous_owner: c.owner,
                    owner: c.owner,
                    captured: false,
                    garrison: c.garrison,
                }),
                spells_applied,
            };
        };

        let opposition: f64 = contenders
            .iter()
            .filter(|c| c.faction != winner.faction)
            .map(|c| c.power)
            .sum();
        let remaining = (winner.power - opposition).max(0.0);
        let survivors = saturate(units_after(winner.units, winner.power, remaining).max(1));

        let (final_strength, castle_outcome) = match castle {
            Some(c) if c.owner != winner.faction => {
                let garrison = survivors.min(c.capacity);
                (
                    garrison,
                    Some(CastleOutcome {
                        tile: input.tile,
                        previous_owner: c.owner,
                        owner: winner.faction,
                        captured: true,
                        garrison,
                    }),
                )
            }
            Some(c) => (
                survivors,
                Some(CastleOutcome {
                    tile: input.tile,
                    previous_owner: c.owner,
                    owner: c.owner,
                    captured: false,
                    garrison: survivors,
                }),
            ),
            None => (survivors, None),
        };

        for outcome in &mut outcomes {
            if outcome.faction == winner.faction {
                outcome.final_strength = final_strength;
                outcome.survived = final_strength > 0;
            } else {
                outcome.final_strength = 0;
                outcome.survived = false;
            }
        }

        CombatResolution {
            tile: input.tile,
            kind,
            outcomes,
            winner: Some(winner.faction),
            survivors: final_strength,
            castle: castle_outcome,
            spells_applied,
        }
    }

    // -------------------------------------------------------------------------
    // Applying to the World
    // -------------------------------------------------------------------------

    /// Resolves `tile` in place.
    ///
    /// Gathers the stationary stacks and castle on the tile plus the arriving
    /// transit unit, if given, computes the outcome and writes it back:
    /// losers' stacks are cleared, the winner ends as one stack or as the
    /// garrison, and a winning arrival that is mid-path on an open tile keeps
    /// marching with its survivors. Contested tiles consume their spell queue,
    /// emit a combat event, and report any faction whose global total hit zero.
    ///
    /// Transit units merely passing through the tile take no part. Returns
    /// `None` when there is nothing on the tile to resolve.
    pub fn resolve_tile(
        &self,
        world: &mut World,
        tile: TileCoord,
        arrival: Option<UnitId>,
    ) -> Option<TileResolution> {
        let stacks: Vec<UnitStack> = world.stacks_on_tile(tile).into_iter().cloned().collect();
        let arriving: Option<TransitUnit> = arrival
            .and_then(|id| world.transit(id))
            .filter(|transit| transit.current_tile == tile)
            .cloned();
        let castle = world.castle(tile).cloned();
        if stacks.is_empty() && arriving.is_none() && castle.is_none() {
            return None;
        }

        let collision = match &arriving {
            Some(transit) => world.occupancy().detect_arrival(tile, transit.id),
            None => world.occupancy().detect_collision(tile),
        };
        let contested = collision.is_some();

        let mut input = CombatInput::new(tile, world.grid().combat_modifier_at(tile));
        if let Some(castle) = &castle {
            input = input.with_castle(castle.into());
        }
        for stack in &stacks {
            input = input.with_combatant(Combatant::new(
                stack.faction,
                i64::from(stack.count),
                CombatSide::Defender,
            ));
        }
        if let Some(transit) = &arriving {
            let holds_tile = castle.as_ref().is_some_and(|c| c.owner == transit.faction)
                || stacks.iter().any(|stack| stack.faction == transit.faction);
            let side = if holds_tile {
                CombatSide::Defender
            } else {
                CombatSide::Attacker
            };
            input = input.with_combatant(Combatant::new(transit.faction, i64::from(transit.count), side));
        }

        if contested {
            input = input.with_spells(world.take_spells(tile));
        }

        let resolution = self.resolve(&input);
        let fate = Self::apply(world, &resolution, &stacks, arriving.as_ref());

        if contested {
            info!(
                %tile,
                kind = ?resolution.kind,
                winner = ?resolution.winner,
                survivors = resolution.survivors,
                captured = resolution.captured(),
                "resolved combat"
            );
            world.push_event(SimEvent::Combat {
                time: world.time(),
                resolution: resolution.clone(),
            });
            Self::signal_eliminations(world, &resolution);
        } else {
            debug!(%tile, survivors = resolution.survivors, "merged units");
        }

        Some(TileResolution {
            resolution,
            arrival: fate,
        })
    }

    fn apply(
        world: &mut World,
        resolution: &CombatResolution,
        stacks: &[UnitStack],
        arriving: Option<&TransitUnit>,
    ) -> Option<ArrivalFate> {
        if let Some(castle) = resolution.castle {
            world.set_castle(castle.tile, castle.owner, castle.garrison);
            for stack in stacks {
                world.remove_stack(stack.id);
            }
            return arriving.map(|transit| {
                world.remove_transit(transit.id);
                if transit.faction == castle.owner {
                    ArrivalFate::Settled
                } else {
                    ArrivalFate::Destroyed
                }
            });
        }

        let Some(winner) = resolution.winner else {
            for stack in stacks {
                world.remove_stack(stack.id);
            }
            return arriving.map(|transit| {
                world.remove_transit(transit.id);
                ArrivalFate::Destroyed
            });
        };
        let survivors = resolution.survivors;
        let holder = stacks.iter().find(|stack| stack.faction == winner).map(|s| s.id);

        // A winning arrival on an open tile with road still ahead keeps going.
        if let Some(transit) = arriving {
            if transit.faction == winner
                && resolution.is_contested()
                && holder.is_none()
                && !transit.path.is_empty()
            {
                for stack in stacks {
                    world.remove_stack(stack.id);
                }
                if let Some(unit) = world.transit_mut(transit.id) {
                    unit.count = survivors;
                }
                return Some(ArrivalFate::Continue { count: survivors });
            }
        }

        for stack in stacks.iter().filter(|stack| Some(stack.id) != holder) {
            world.remove_stack(stack.id);
        }
        match holder {
            Some(id) => {
                world.set_stack_count(id, survivors);
                arriving.map(|transit| {
                    world.remove_transit(transit.id);
                    if transit.faction == winner {
                        ArrivalFate::Settled
                    } else {
                        ArrivalFate::Destroyed
                    }
                })
            }
            None => arriving.map(|transit| {
                if transit.faction == winner {
                    world.settle_transit(transit.id, survivors);
                    ArrivalFate::Settled
                } else {
                    world.remove_transit(transit.id);
                    ArrivalFate::Destroyed
                }
            }),
        }
    }

    fn signal_eliminations(world: &mut World, resolution: &CombatResolution) {
        for outcome in &resolution.outcomes {
            let faction = outcome.faction;
            if world.faction_total(faction) == 0 && world.mark_eliminated(faction) {
                info!(%faction, tile = %resolution.tile, "faction eliminated");
                world.push_event(SimEvent::FactionEliminated {
                    time: world.time(),
                    faction,
                });
            }
        }
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

fn clamp_count(units: i64) -> u32 {
    u32::try_from(units.max(0)).unwrap_or(u32::MAX)
}

fn saturate(units: u64) -> u32 {
    u32::try_from(units).unwrap_or(u32::MAX)
}

fn gather(input: &CombatInput) -> BTreeMap<FactionId, Force> {
    let mut forces: BTreeMap<FactionId, Force> = BTreeMap::new();
    for combatant in &input.combatants {
        let force = forces.entry(combatant.faction).or_insert(Force {
            units: 0,
            side: combatant.side,
        });
        force.units += u64::from(combatant.units);
        if combatant.side == CombatSide::Defender {
            force.side = CombatSide::Defender;
        }
    }
    forces
}

fn initial_outcomes(input: &CombatInput, forces: &BTreeMap<FactionId, Force>) -> Vec<FactionOutcome> {
    let mut initial: BTreeMap<FactionId, u64> =
        forces.iter().map(|(&faction, force)| (faction, force.units)).collect();
    if let Some(castle) = input.castle {
        *initial.entry(castle.owner).or_insert(0) += u64::from(castle.garrison);
    }
    initial
        .into_iter()
        .map(|(faction, units)| FactionOutcome {
            faction,
            initial_strength: saturate(units),
            survived: units > 0,
            final_strength: saturate(units),
        })
        .collect()
}

fn terrain_factor(input: &CombatInput) -> f64 {
    f64::from(input.terrain_modifier).max(0.0)
}

fn side_factor(side: CombatSide, terrain: f64) -> f64 {
    match side {
        CombatSide::Attacker => 1.0,
        CombatSide::Defender => terrain,
    }
}

#[allow(clippy::cast_precision_loss)]
fn garrison_power(castle: CastleDefense, terrain: f64) -> f64 {
    f64::from(castle.garrison) * f64::from(castle.defense).max(0.0) * terrain
}

/// Units left when `power` is reduced to `remaining`, rounded down.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn units_after(units: u64, power: f64, remaining: f64) -> u64 {
    if power <= 0.0 {
        return if remaining >= 0.0 { units } else { 0 };
    }
    let scaled = (units as f64 * remaining.max(0.0) / power).floor();
    (scaled as u64).min(units)
}
