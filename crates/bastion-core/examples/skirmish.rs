//! Runs a small three-faction skirmish around a castle and prints the event
//! stream as JSON lines.
//!
//! ```text
//! RUST_LOG=bastion_core=debug cargo run -p bastion-core --example skirmish
//! ```

use anyhow::Result;
use bastion_core::{
    FactionId, MoveRequest, MoveSource, SimConfig, SimEvent, Simulation, SpellEffect, SpellTargets, TerrainGrid,
    TerrainKind, TileCoord, UnitKind,
};
use tracing::info;

const RED: FactionId = FactionId::new(0);
const BLUE: FactionId = FactionId::new(1);
const GREEN: FactionId = FactionId::new(2);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut grid = TerrainGrid::filled(12, 8, TerrainKind::Grassland)?;
    for y in 0..6 {
        grid.set_terrain(TileCoord::new(5, y), TerrainKind::Mountain)?;
    }
    for x in 0..12 {
        grid.set_terrain(TileCoord::new(x, 7), TerrainKind::Road)?;
    }
    grid.set_terrain(TileCoord::new(9, 3), TerrainKind::Forest)?;

    let mut sim = Simulation::new(grid, SimConfig::default())?;
    let keep = TileCoord::new(9, 3);
    sim.add_castle(keep, GREEN, 15)?;

    let red = sim.place_stack(RED, TileCoord::new(0, 0), 40, UnitKind::Infantry)?;
    let blue = sim.place_stack(BLUE, TileCoord::new(0, 7), 20, UnitKind::Cavalry)?;
    sim.queue_spell(keep, SpellEffect::damage(6.0, SpellTargets::DEFENDER))?;

    let results = sim.issue_moves(&[
        MoveRequest::new(MoveSource::Stack(red), TileCoord::new(0, 0), keep, 35),
        MoveRequest::new(MoveSource::Stack(blue), TileCoord::new(0, 7), keep, 20),
    ]);
    for result in results {
        let id = result?;
        info!(%id, "order accepted");
    }

    let mut steps = 0;
    while !sim.world().moving_transits().is_empty() && steps < 500 {
        sim.step(100.0);
        for event in sim.take_events() {
            if !matches!(event, SimEvent::Transition(_)) {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
        steps += 1;
    }

    for faction in [RED, BLUE, GREEN] {
        let report = sim.situation(faction);
        info!(
            %faction,
            total = report.total(),
            eliminated = report.eliminated,
            "final position"
        );
    }
    sim.check_invariants()?;
    Ok(())
}
