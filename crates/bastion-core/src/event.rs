//! Structured events surfaced to external systems.
//!
//! Everything the core wants the outside world to know (tile transitions,
//! movement milestones, combat outcomes, eliminations) is recorded as a
//! [`SimEvent`] in the world's [`EventLog`]. The log only records; consumers
//! drain it with `take_events()`, typically once per step.

use bastion_grid::TileCoord;
use serde::{Deserialize, Serialize};

use crate::entity::{FactionId, UnitId};
use crate::resolver::CombatResolution;

/// Point in simulated time.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of completed steps.
    pub tick: u64,
    /// Simulated milliseconds since the start.
    pub elapsed_ms: f64,
}

impl SimTime {
    /// Time `offset_ms` into the current step.
    #[must_use]
    pub fn offset(self, offset_ms: f64) -> Self {
        Self {
            tick: self.tick,
            elapsed_ms: self.elapsed_ms + offset_ms,
        }
    }

    /// Time after completing a step of `delta_ms`.
    #[must_use]
    pub fn advanced(self, delta_ms: f64) -> Self {
        Self {
            tick: self.tick + 1,
            elapsed_ms: self.elapsed_ms + delta_ms,
        }
    }
}

/// Direction of a tile transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// The unit entered the tile.
    Enter,
    /// The unit left the tile.
    Exit,
}

/// A unit entering or leaving a tile.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Unit concerned.
    pub unit: UnitId,
    /// Faction of the unit.
    pub faction: FactionId,
    /// Tile entered or left.
    pub tile: TileCoord,
    /// Direction.
    pub kind: TransitionKind,
    /// When it happened.
    pub time: SimTime,
}

/// Event emitted by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Occupancy transition.
    Transition(TransitionEvent),
    /// A transit unit set off.
    MovementStarted {
        /// When it happened.
        time: SimTime,
        /// Transit unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Origin tile.
        from: TileCoord,
        /// Destination tile.
        to: TileCoord,
        /// Units carried.
        count: u32,
    },
    /// A transit unit reached the end of its path.
    Arrived {
        /// When it happened.
        time: SimTime,
        /// Transit unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Destination tile.
        tile: TileCoord,
        /// Units carried.
        count: u32,
    },
    /// A transit unit hit a foreign presence before its destination.
    Intercepted {
        /// When it happened.
        time: SimTime,
        /// Transit unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Tile of the interception.
        tile: TileCoord,
    },
    /// A transit unit was stopped by request.
    MovementCancelled {
        /// When it happened.
        time: SimTime,
        /// Transit unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Tile it stood on.
        tile: TileCoord,
    },
    /// Live terrain closed the next tile of a transit unit's path.
    MovementBlocked {
        /// When it happened.
        time: SimTime,
        /// Transit unit.
        unit: UnitId,
        /// Its faction.
        faction: FactionId,
        /// Tile it halted on.
        tile: TileCoord,
        /// Tile that could not be entered.
        blocked: TileCoord,
    },
    /// A contested tile was resolved.
    Combat {
        /// When it happened.
        time: SimTime,
        /// Full outcome.
        resolution: CombatResolution,
    },
    /// A faction's global unit total reached zero.
    FactionEliminated {
        /// When it happened.
        time: SimTime,
        /// Eliminated faction.
        faction: FactionId,
    },
}

impl SimEvent {
    /// When the event happened.
    #[must_use]
    pub fn time(&self) -> SimTime {
        match self {
            Self::Transition(transition) => transition.time,
            Self::MovementStarted { time, .. }
            | Self::Arrived { time, .. }
            | Self::Intercepted { time, .. }
            | Self::MovementCancelled { time, .. }
            | Self::MovementBlocked { time, .. }
            | Self::Combat { time, .. }
            | Self::FactionEliminated { time, .. } => *time,
        }
    }

    /// Returns the transition, if this is one.
    #[must_use]
    pub fn as_transition(&self) -> Option<&TransitionEvent> {
        match self {
            Self::Transition(transition) => Some(transition),
            _ => None,
        }
    }

    /// Returns the combat resolution, if this is one.
    #[must_use]
    pub fn as_combat(&self) -> Option<&CombatResolution> {
        match self {
            Self::Combat { resolution, .. } => Some(resolution),
            _ => None,
        }
    }
}

/// Append-only record of simulation events.
///
/// # Example
///
/// ```
/// use bastion_core::entity::FactionId;
/// use bastion_core::event::{EventLog, SimEvent, SimTime};
///
/// let mut log = EventLog::new();
/// log.push(SimEvent::FactionEliminated { time: SimTime::default(), faction: FactionId::new(1) });
/// assert_eq!(log.len(), 1);
///
/// let events = log.take_events();
/// assert_eq!(events.len(), 1);
/// assert!(log.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records an event.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
    }

    /// Drains and returns all recorded events in emission order.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discards all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Iterates over recorded events without draining them.
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }
}

impl Extend<SimEvent> for EventLog {
    fn extend<I: IntoIterator<Item = SimEvent>>(&mut self, iter: I) {
        self.events.extend(iter);
    }
}
