//! Determinism verification tests.
//!
//! These tests verify that the simulation produces identical results when
//! given identical maps, placements, requests and deltas. The event stream is
//! the contract with external systems, so it is compared in full.

use bastion_grid::TerrainKind;

use crate::entity::MoveSource;
use crate::event::SimEvent;
use crate::simulation::{MoveRequest, Simulation};

use super::helpers::{generated_sim, march, open_sim, stack, tile, BLUE, GREEN, RED};

/// Three factions converging on a castle in the middle of a generated map.
fn skirmish(seed: u64) -> (Simulation, Vec<MoveRequest>) {
    let mut sim = generated_sim(seed, 16, 16);
    for at in [tile(0, 0), tile(15, 15), tile(0, 15), tile(15, 0), tile(8, 8)] {
        sim.world_mut().set_terrain(at, TerrainKind::Grassland).unwrap();
    }
    sim.add_castle(tile(8, 8), GREEN, 12).unwrap();

    let red = stack(&mut sim, RED, tile(0, 0), 30);
    let blue = stack(&mut sim, BLUE, tile(15, 15), 25);
    let green = stack(&mut sim, GREEN, tile(0, 15), 10);

    let requests = vec![
        MoveRequest::new(MoveSource::Stack(red), tile(0, 0), tile(8, 8), 20),
        MoveRequest::new(MoveSource::Stack(blue), tile(15, 15), tile(8, 8), 25),
        MoveRequest::new(MoveSource::Stack(green), tile(0, 15), tile(0, 0), 10),
        MoveRequest::new(MoveSource::Stack(red), tile(0, 0), tile(15, 0), 10),
        MoveRequest::new(MoveSource::Stack(red), tile(0, 0), tile(15, 0), 1),
    ];
    (sim, requests)
}

fn run(sim: &mut Simulation, deltas: &[f64]) -> Vec<SimEvent> {
    let mut events = sim.take_events();
    for &delta in deltas {
        sim.step(delta);
        events.extend(sim.take_events());
    }
    events
}

const DELTAS: [f64; 8] = [16.0, 250.0, 1000.0, 33.3, 5000.0, 5000.0, 20_000.0, 60_000.0];

#[test]
fn same_inputs_same_events() {
    let (mut a, requests) = skirmish(42);
    let (mut b, _) = skirmish(42);
    assert_eq!(a.issue_moves(&requests), b.issue_moves(&requests));

    let events_a = run(&mut a, &DELTAS);
    let events_b = run(&mut b, &DELTAS);
    assert!(!events_a.is_empty());
    assert_eq!(events_a, events_b);

    let stacks_a: Vec<_> = a.world().stacks().cloned().collect();
    let stacks_b: Vec<_> = b.world().stacks().cloned().collect();
    assert_eq!(stacks_a, stacks_b);
    let castles_a: Vec<_> = a.world().castles().cloned().collect();
    let castles_b: Vec<_> = b.world().castles().cloned().collect();
    assert_eq!(castles_a, castles_b);
}

#[test]
fn batch_matches_sequential_requests() {
    let (mut batched, requests) = skirmish(7);
    let (mut sequential, _) = skirmish(7);

    let batch_results = batched.issue_moves(&requests);
    let one_by_one: Vec<_> = requests.iter().map(|r| sequential.issue_move(r)).collect();
    assert_eq!(batch_results, one_by_one);

    let transits_batched: Vec<_> = batched.world().transits().cloned().collect();
    let transits_sequential: Vec<_> = sequential.world().transits().cloned().collect();
    assert_eq!(transits_batched, transits_sequential);

    assert_eq!(run(&mut batched, &DELTAS), run(&mut sequential, &DELTAS));
}

#[test]
fn step_size_does_not_change_outcome_on_open_ground() {
    let mut coarse = open_sim(10, 1);
    let mut fine = open_sim(10, 1);
    for sim in [&mut coarse, &mut fine] {
        stack(sim, BLUE, tile(6, 0), 4);
        march(sim, RED, tile(0, 0), tile(9, 0), 10);
    }

    coarse.step(20_000.0);
    for _ in 0..1250 {
        fine.step(16.0);
    }

    let summary = |sim: &Simulation| -> Vec<_> { sim.world().stacks().map(|s| (s.faction, s.tile, s.count)).collect() };
    assert_eq!(summary(&coarse), summary(&fine));
    assert_eq!(summary(&coarse), vec![(RED, tile(9, 0), 6)]);
}
