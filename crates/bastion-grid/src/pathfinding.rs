//! A* pathfinding over the terrain grid.
//!
//! # Costs
//!
//! Moving into a tile costs `1 / movement_modifier` of that tile, so a road
//! (modifier 2.0) costs 0.5 and a swamp (modifier 0.5) costs 2.0. Tiles whose
//! modifier is zero, or whose terrain is flagged impassable, are pruned. The
//! goal is the one exception: a castle may be besieged even when its terrain
//! is impassable, and entering it costs a neutral 1.0.
//!
//! # Heuristic
//!
//! Manhattan distance scaled by the cheapest hop the terrain table allows.
//! Unscaled Manhattan distance would overestimate on road networks and break
//! optimality; the scaled form stays admissible and consistent.
//!
//! # Ordering
//!
//! The open set is a binary heap ordered by lowest f-score, then by insertion
//! order, so equal-cost searches always expand in the same sequence.
//!
//! # Budget
//!
//! Every search runs under a [`SearchBudget`]. A search that exhausts its
//! budget before reaching the goal returns an empty path with
//! [`SearchOutcome::BudgetExhausted`]; it never blocks indefinitely and never
//! hands back a partial route.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace, warn};

use crate::coord::TileCoord;
use crate::grid::TerrainGrid;

/// How often (in expansions) the wall clock is consulted.
const CLOCK_CHECK_INTERVAL: usize = 64;

// =============================================================================
// Budget and Results
// =============================================================================

/// Limits applied to a single path search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBudget {
    /// Wall-clock limit for one search.
    pub max_duration: Duration,
    /// Optional cap on expanded nodes; deterministic, unlike the clock.
    pub max_expansions: Option<usize>,
}

impl SearchBudget {
    /// Budget with a wall-clock limit only.
    #[must_use]
    pub const fn with_duration(max_duration: Duration) -> Self {
        Self {
            max_duration,
            max_expansions: None,
        }
    }

    /// Adds a node-expansion cap, builder style.
    #[must_use]
    pub const fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = Some(max_expansions);
        self
    }

    fn is_exhausted(&self, expansions: usize, started: Instant) -> bool {
        if self.max_expansions.is_some_and(|cap| expansions > cap) {
            return true;
        }
        expansions % CLOCK_CHECK_INTERVAL == 0 && started.elapsed() > self.max_duration
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::with_duration(Duration::from_millis(100))
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchOutcome {
    /// A route to the goal was found.
    Found,
    /// Start and goal are the same tile.
    Trivial,
    /// Start or goal lies outside the grid.
    OutOfBounds,
    /// No route exists, or the goal cannot be entered.
    Unreachable,
    /// The search budget ran out before the goal was reached.
    BudgetExhausted,
}

/// Result of a path search.
///
/// `steps` excludes the starting tile and ends on the goal, except for the
/// trivial same-tile search which returns the single start tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    steps: Vec<TileCoord>,
    cost: f32,
    outcome: SearchOutcome,
}

impl Path {
    fn empty(outcome: SearchOutcome) -> Self {
        Self {
            steps: Vec::new(),
            cost: 0.0,
            outcome,
        }
    }

    /// Ordered tiles to traverse.
    #[must_use]
    pub fn steps(&self) -> &[TileCoord] {
        &self.steps
    }

    /// Consumes the path, returning its tiles.
    #[must_use]
    pub fn into_steps(self) -> Vec<TileCoord> {
        self.steps
    }

    /// Number of tiles in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` when there is nothing to traverse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of hop costs along the path.
    #[must_use]
    pub fn cost(&self) -> f32 {
        self.cost
    }

    /// How the search ended.
    #[must_use]
    pub fn outcome(&self) -> SearchOutcome {
        self.outcome
    }

    /// Returns `true` for found and trivial paths.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found | SearchOutcome::Trivial)
    }

    /// Final tile of the path.
    #[must_use]
    pub fn goal(&self) -> Option<TileCoord> {
        self.steps.last().copied()
    }
}

// =============================================================================
// Open Set
// =============================================================================

/// Entry in the open set.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f_score: f32,
    seq: u64,
    index: usize,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the lowest f-score, then the oldest entry.
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// Pathfinder
// =============================================================================

/// A* search over an immutable grid snapshot.
///
/// # Example
///
/// ```
/// use bastion_grid::{Pathfinder, SearchOutcome, TerrainGrid, TerrainKind, TileCoord};
///
/// let grid = TerrainGrid::filled(5, 5, TerrainKind::Grassland).unwrap();
/// let path = Pathfinder::new(&grid).find_path(TileCoord::new(0, 0), TileCoord::new(3, 0));
///
/// assert_eq!(path.outcome(), SearchOutcome::Found);
/// assert_eq!(
///     path.steps(),
///     &[TileCoord::new(1, 0), TileCoord::new(2, 0), TileCoord::new(3, 0)]
/// );
/// assert!((path.cost() - 3.0).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pathfinder<'a> {
    grid: &'a TerrainGrid,
    budget: SearchBudget,
}

impl<'a> Pathfinder<'a> {
    /// Creates a pathfinder with the default budget.
    #[must_use]
    pub fn new(grid: &'a TerrainGrid) -> Self {
        Self {
            grid,
            budget: SearchBudget::default(),
        }
    }

    /// Replaces the search budget, builder style.
    #[must_use]
    pub fn with_budget(mut self, budget: SearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// The grid being searched.
    #[must_use]
    pub fn grid(&self) -> &'a TerrainGrid {
        self.grid
    }

    /// Finds the cheapest 4-directional route from `start` to `goal`.
    ///
    /// Returns an empty path when either end is outside the grid, when the
    /// goal can be neither entered nor besieged, when no route exists, or when
    /// the budget runs out first. `start == goal` yields the single-tile
    /// trivial path.
    #[must_use]
    pub fn find_path(&self, start: TileCoord, goal: TileCoord) -> Path {
        let grid = self.grid;
        let (Some(start_index), Some(goal_index)) = (grid.index_of(start), grid.index_of(goal)) else {
            return Path::empty(SearchOutcome::OutOfBounds);
        };
        if start == goal {
            return Path {
                steps: vec![start],
                cost: 0.0,
                outcome: SearchOutcome::Trivial,
            };
        }
        if grid.approach_modifier_at(goal).is_none() {
            return Path::empty(SearchOutcome::Unreachable);
        }

        let scale = grid.model().min_hop_cost();
        #[allow(clippy::cast_precision_loss)]
        let heuristic = |coord: TileCoord| coord.manhattan(goal) as f32 * scale;

        let mut g_score = vec![f32::INFINITY; grid.len()];
        let mut came_from: Vec<Option<usize>> = vec![None; grid.len()];
        let mut closed = vec![false; grid.len()];
        let mut open = BinaryHeap::new();
        let mut seq = 0_u64;

        g_score[start_index] = 0.0;
        open.push(OpenNode {
            f_score: heuristic(start),
            seq,
            index: start_index,
        });

        let started = Instant::now();
        let mut expansions = 0_usize;

        while let Some(OpenNode { index: current, .. }) = open.pop() {
            if closed[current] {
                continue;
            }
            if current == goal_index {
                return Self::reconstruct(grid, &came_from, goal_index, g_score[goal_index]);
            }
            closed[current] = true;

            expansions += 1;
            if self.budget.is_exhausted(expansions, started) {
                warn!(%start, %goal, expansions, "path search exhausted its budget");
                return Path::empty(SearchOutcome::BudgetExhausted);
            }

            let Some(coord) = grid.coord_of(current) else {
                continue;
            };
            for neighbor in coord.neighbors() {
                let Some(next) = grid.index_of(neighbor) else {
                    continue;
                };
                if closed[next] {
                    continue;
                }
                let modifier = if next == goal_index {
                    grid.approach_modifier_at(neighbor)
                } else {
                    grid.movement_modifier_at(neighbor)
                };
                let Some(modifier) = modifier else {
                    continue;
                };

                let tentative = g_score[current] + 1.0 / modifier;
                if tentative < g_score[next] {
                    g_score[next] = tentative;
                    came_from[next] = Some(current);
                    seq += 1;
                    open.push(OpenNode {
                        f_score: tentative + heuristic(neighbor),
                        seq,
                        index: next,
                    });
                }
            }
        }

        trace!(%start, %goal, expansions, "no route");
        Path::empty(SearchOutcome::Unreachable)
    }

    fn reconstruct(grid: &TerrainGrid, came_from: &[Option<usize>], goal: usize, cost: f32) -> Path {
        let mut steps = Vec::new();
        let mut current = goal;
        // The start tile is the only one without a predecessor, so it is left out.
        while let Some(previous) = came_from[current] {
            if let Some(coord) = grid.coord_of(current) {
                steps.push(coord);
            }
            current = previous;
        }
        steps.reverse();
        Path {
            steps,
            cost,
            outcome: SearchOutcome::Found,
        }
    }

    /// Runs many searches in parallel against the same snapshot.
    ///
    /// Results are returned in request order.
    #[instrument(skip_all, fields(count = requests.len()))]
    #[must_use]
    pub fn find_paths(&self, requests: &[(TileCoord, TileCoord)]) -> Vec<Path> {
        requests
            .par_iter()
            .map(|&(start, goal)| self.find_path(start, goal))
            .collect()
    }

    /// Cost of walking `steps`, or `None` if any tile cannot be entered.
    ///
    /// The final tile is costed like a search goal, so a besieged castle is
    /// accepted at neutral cost.
    #[must_use]
    pub fn path_cost(&self, steps: &[TileCoord]) -> Option<f32> {
        let last = steps.len().checked_sub(1)?;
        steps.iter().enumerate().try_fold(0.0_f32, |total, (i, &tile)| {
            let modifier = if i == last {
                self.grid.approach_modifier_at(tile)
            } else {
                self.grid.movement_modifier_at(tile)
            }?;
            Some(total + 1.0 / modifier)
        })
    }
}
