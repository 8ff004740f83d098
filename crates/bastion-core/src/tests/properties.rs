//! Property tests for pathfinding, conservation and combat.

use bastion_grid::{MapGenerator, Pathfinder, SearchOutcome, TerrainKind, TileCoord};
use proptest::prelude::*;

use crate::entity::{FactionId, MoveSource};
use crate::resolver::{CastleDefense, CombatInput, CombatResolver, Combatant};
use crate::simulation::MoveRequest;
use crate::spell::{CombatSide, SpellEffect, SpellTargets};

use super::helpers::{open_sim, stack, tile, RED};

const SIZE: i32 = 12;

fn coord() -> impl Strategy<Value = TileCoord> {
    (0..SIZE, 0..SIZE).prop_map(|(x, y)| TileCoord::new(x, y))
}

fn combatant() -> impl Strategy<Value = Combatant> {
    (0u32..4, -5i64..200, any::<bool>()).prop_map(|(faction, units, defends)| {
        let side = if defends { CombatSide::Defender } else { CombatSide::Attacker };
        Combatant::new(FactionId::new(faction), units, side)
    })
}

fn spell() -> impl Strategy<Value = SpellEffect> {
    let targets = prop_oneof![
        Just(SpellTargets::ATTACKER),
        Just(SpellTargets::DEFENDER),
        Just(SpellTargets::BOTH),
    ];
    (0u8..3, 0.0f32..20.0, targets).prop_map(|(kind, amount, targets)| match kind {
        0 => SpellEffect::damage(amount, targets),
        1 => SpellEffect::heal(amount, targets),
        _ => SpellEffect::buff(amount / 10.0, targets),
    })
}

fn castle() -> impl Strategy<Value = Option<CastleDefense>> {
    proptest::option::of((0u32..4, 0u32..100, 1u32..150, 0.5f32..2.0).prop_map(
        |(owner, garrison, capacity, defense)| CastleDefense {
            owner: FactionId::new(owner),
            garrison,
            capacity,
            defense,
        },
    ))
}

proptest! {
    #[test]
    fn found_paths_are_connected(seed in any::<u64>(), start in coord(), goal in coord()) {
        let grid = MapGenerator::new(seed).generate(SIZE, SIZE).unwrap();
        let path = Pathfinder::new(&grid).find_path(start, goal);
        prop_assume!(path.outcome() == SearchOutcome::Found);

        let steps = path.steps();
        prop_assert!(start.is_adjacent(steps[0]));
        for pair in steps.windows(2) {
            prop_assert!(pair[0].is_adjacent(pair[1]));
        }
        prop_assert_eq!(path.goal(), Some(goal));
        prop_assert!(!steps.contains(&start));
        for &step in steps {
            prop_assert!(grid.movement_modifier_at(step).is_some());
        }
    }

    #[test]
    fn impassable_goal_gives_empty_path(
        seed in any::<u64>(),
        start in coord(),
        goal in coord(),
        water in any::<bool>(),
    ) {
        prop_assume!(start != goal);
        let mut grid = MapGenerator::new(seed).generate(SIZE, SIZE).unwrap();
        let blocker = if water { TerrainKind::Water } else { TerrainKind::Mountain };
        grid.set_terrain(goal, blocker).unwrap();

        let path = Pathfinder::new(&grid).find_path(start, goal);
        prop_assert!(path.is_empty());
        prop_assert_eq!(path.outcome(), SearchOutcome::Unreachable);
    }

    #[test]
    fn moves_conserve_units(
        orders in proptest::collection::vec((coord(), 1u32..40, 1.0f64..5000.0), 1..12),
    ) {
        let mut sim = open_sim(SIZE, SIZE);
        stack(&mut sim, RED, tile(0, 0), 60);
        stack(&mut sim, RED, tile(SIZE - 1, SIZE - 1), 40);

        for (to, count, delta) in orders {
            let source = sim.world().stacks().next().map(|s| (s.id, s.tile, s.count));
            if let Some((id, from, available)) = source {
                let request = MoveRequest::new(MoveSource::Stack(id), from, to, count.min(available));
                let _ = sim.issue_move(&request);
            }
            sim.step(delta);
            prop_assert_eq!(sim.world().faction_total(RED), 100);
            prop_assert!(sim.check_invariants().is_ok());
        }
    }

    #[test]
    fn combat_is_deterministic_and_order_independent(
        combatants in proptest::collection::vec(combatant(), 0..8),
        spells in proptest::collection::vec(spell(), 0..4),
        castle in castle(),
        terrain in 0.5f32..2.0,
    ) {
        let mut input = CombatInput::new(TileCoord::new(0, 0), terrain).with_spells(spells);
        input.castle = castle;
        input.combatants = combatants.clone();
        let mut reversed = input.clone();
        reversed.combatants.reverse();

        let resolver = CombatResolver::new();
        let first = resolver.resolve(&input);
        prop_assert_eq!(&first, &resolver.resolve(&input));
        prop_assert_eq!(&first, &resolver.resolve(&reversed));

        // Survivors never exceed what went in
        let total: u64 = first.outcomes.iter().map(|o| u64::from(o.initial_strength)).sum();
        prop_assert!(u64::from(first.survivors) <= total);
    }

    #[test]
    fn dominant_winner_keeps_at_least_one(
        others in proptest::collection::vec(1u32..50, 1..4),
        margin in 1u32..500,
    ) {
        let opposition: u32 = others.iter().sum();
        let strongest = opposition + margin;
        let winner = FactionId::new(10);

        let mut input = CombatInput::new(TileCoord::new(0, 0), 1.0)
            .with_combatant(Combatant::new(winner, i64::from(strongest), CombatSide::Attacker));
        for (i, &units) in others.iter().enumerate() {
            let faction = FactionId::new(u32::try_from(i).unwrap());
            input = input.with_combatant(Combatant::new(faction, i64::from(units), CombatSide::Defender));
        }

        let resolution = CombatResolver::new().resolve(&input);
        prop_assert_eq!(resolution.winner, Some(winner));
        prop_assert!(resolution.survivors >= 1);
        prop_assert_eq!(resolution.survivors, margin);
    }
}
