use bastion_core::{FactionId, MoveRequest, MoveSource, SimConfig, Simulation, TerrainKind, TileCoord, UnitKind};
use bastion_grid::MapGenerator;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SIZE: i32 = 64;

/// Four factions with stacks scattered over a generated map.
fn populated(seed: u64, stacks_per_faction: usize) -> Simulation {
    let grid = MapGenerator::new(seed).generate(SIZE, SIZE).unwrap();
    let mut sim = Simulation::new(grid, SimConfig::default()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for faction in 0..4 {
        for _ in 0..stacks_per_faction {
            let tile = TileCoord::new(rng.gen_range(0..SIZE), rng.gen_range(0..SIZE));
            sim.world_mut().set_terrain(tile, TerrainKind::Grassland).unwrap();
            let count = rng.gen_range(5..60);
            sim.place_stack(FactionId::new(faction), tile, count, UnitKind::Infantry)
                .unwrap();
        }
    }
    sim
}

/// One move order per stack toward a random destination.
fn orders(sim: &Simulation, seed: u64) -> Vec<MoveRequest> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
    sim.world()
        .stacks()
        .map(|stack| {
            let to = TileCoord::new(rng.gen_range(0..SIZE), rng.gen_range(0..SIZE));
            MoveRequest::new(MoveSource::Stack(stack.id), stack.tile, to, stack.count / 2 + 1)
        })
        .collect()
}

fn bench_issue_moves(c: &mut Criterion) {
    let base = populated(11, 32);
    let requests = orders(&base, 11);

    c.bench_function("issue_moves_128", |b| {
        b.iter_batched(
            || base.clone(),
            |mut sim| black_box(sim.issue_moves(&requests)),
            BatchSize::LargeInput,
        )
    });
}

fn bench_step(c: &mut Criterion) {
    let mut base = populated(23, 32);
    let requests = orders(&base, 23);
    let _ = base.issue_moves(&requests);

    c.bench_function("step_16ms_128_transits", |b| {
        b.iter_batched(
            || base.clone(),
            |mut sim| {
                sim.step(black_box(16.0));
                sim.take_events()
            },
            BatchSize::LargeInput,
        )
    });

    c.bench_function("step_to_idle_128_transits", |b| {
        b.iter_batched(
            || base.clone(),
            |mut sim| {
                for _ in 0..200 {
                    sim.step(black_box(1000.0));
                }
                sim.take_events().len()
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_issue_moves, bench_step);
criterion_main!(benches);
