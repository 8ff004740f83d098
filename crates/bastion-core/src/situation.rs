//! Per-faction view of the world for external decision makers.

use std::collections::BTreeSet;

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};

use crate::entity::{FactionId, UnitId};
use crate::event::SimTime;
use crate::world::World;

/// A stationary stack owned by the reporting faction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummary {
    /// Stack id.
    pub unit: UnitId,
    /// Tile it stands on.
    pub tile: TileCoord,
    /// Units in the stack.
    pub count: u32,
}

/// A castle owned by the reporting faction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastleSummary {
    /// Castle tile.
    pub tile: TileCoord,
    /// Garrison.
    pub garrison: u32,
    /// Garrison capacity.
    pub capacity: u32,
}

/// A transit unit owned by the reporting faction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitSummary {
    /// Transit id.
    pub unit: UnitId,
    /// Tile it currently occupies.
    pub tile: TileCoord,
    /// End of its remaining path.
    pub destination: Option<TileCoord>,
    /// Units carried.
    pub count: u32,
}

/// A foreign transit unit heading for one of the faction's holdings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threat {
    /// Transit id.
    pub unit: UnitId,
    /// Its faction.
    pub faction: FactionId,
    /// Tile it currently occupies.
    pub tile: TileCoord,
    /// Holding it is marching on.
    pub destination: TileCoord,
    /// Units carried.
    pub count: u32,
}

/// Snapshot of one faction's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationReport {
    /// Reporting faction.
    pub faction: FactionId,
    /// When the report was taken.
    pub time: SimTime,
    /// Whether the faction has been reported eliminated.
    pub eliminated: bool,
    /// Stationary stacks, in id order.
    pub stacks: Vec<StackSummary>,
    /// Castles, in tile order.
    pub castles: Vec<CastleSummary>,
    /// Transit units, in id order.
    pub transits: Vec<TransitSummary>,
    /// Foreign transit units bound for a tile the faction holds.
    pub threats: Vec<Threat>,
}

impl SituationReport {
    /// Builds the report for `faction`.
    #[must_use]
    pub fn build(world: &World, faction: FactionId) -> Self {
        let stacks: Vec<StackSummary> = world
            .stacks()
            .filter(|stack| stack.faction == faction)
            .map(|stack| StackSummary {
                unit: stack.id,
                tile: stack.tile,
                count: stack.count,
            })
            .collect();
        let castles: Vec<CastleSummary> = world
            .castles()
            .filter(|castle| castle.owner == faction)
            .map(|castle| CastleSummary {
                tile: castle.tile,
                garrison: castle.garrison,
                capacity: castle.capacity,
            })
            .collect();
        let transits = world
            .transits()
            .filter(|transit| transit.faction == faction)
            .map(|transit| TransitSummary {
                unit: transit.id,
                tile: transit.current_tile,
                destination: transit.destination(),
                count: transit.count,
            })
            .collect();

        let held: BTreeSet<TileCoord> = stacks
            .iter()
            .map(|stack| stack.tile)
            .chain(castles.iter().map(|castle| castle.tile))
            .collect();
        let threats = world
            .transits()
            .filter(|transit| transit.faction != faction && transit.is_moving())
            .filter_map(|transit| {
                let destination = transit.destination().filter(|tile| held.contains(tile))?;
                Some(Threat {
                    unit: transit.id,
                    faction: transit.faction,
                    tile: transit.current_tile,
                    destination,
                    count: transit.count,
                })
            })
            .collect();

        Self {
            faction,
            time: world.time(),
            eliminated: world.is_eliminated(faction),
            stacks,
            castles,
            transits,
            threats,
        }
    }

    /// Units the faction holds across stacks, garrisons and transits.
    #[must_use]
    pub fn total(&self) -> u64 {
        let stacks: u64 = self.stacks.iter().map(|s| u64::from(s.count)).sum();
        let castles: u64 = self.castles.iter().map(|c| u64::from(c.garrison)).sum();
        let transits: u64 = self.transits.iter().map(|t| u64::from(t.count)).sum();
        stacks + castles + transits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Castle, MoveSource, MovementState, UnitKind};
    use bastion_grid::{TerrainGrid, TerrainKind};

    const RED: FactionId = FactionId::new(0);
    const BLUE: FactionId = FactionId::new(1);

    #[test]
    fn report_lists_holdings_and_threats() {
        let mut world = World::new(TerrainGrid::filled(6, 6, TerrainKind::Grassland).unwrap());
        let home = TileCoord::new(5, 5);
        world.add_castle(Castle::new(home, RED, 12)).unwrap();
        world.place_stack(RED, TileCoord::new(4, 4), 3, UnitKind::Infantry).unwrap();

        let origin = TileCoord::new(0, 0);
        let blue = world.place_stack(BLUE, origin, 8, UnitKind::Infantry).unwrap();
        let raid = world.spawn_transit(MoveSource::Stack(blue), origin, 8, 1.0).unwrap();
        {
            let transit = world.transit_mut(raid).unwrap();
            transit.path = [TileCoord::new(1, 0), home].into_iter().collect();
            transit.state = MovementState::Moving;
        }

        let report = SituationReport::build(&world, RED);
        assert_eq!(report.stacks.len(), 1);
        assert_eq!(report.castles[0].garrison, 12);
        assert_eq!(report.total(), 15);
        assert_eq!(report.threats.len(), 1);
        assert_eq!(report.threats[0].destination, home);
        assert!(!report.eliminated);

        let blue_report = SituationReport::build(&world, BLUE);
        assert_eq!(blue_report.transits[0].destination, Some(home));
        assert!(blue_report.threats.is_empty());
    }
}
