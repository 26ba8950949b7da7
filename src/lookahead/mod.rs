//! Monte-Carlo lookahead policy (single-threaded and parallel) for 2048.
//!
//! This module provides two policy implementations:
//! - [`Lookahead`]: single-threaded search driven by a caller-supplied RNG.
//! - [`LookaheadParallel`]: rayon-based search; rollout trials run concurrently.
//!
//! Both score each direction as `evaluate(outcome)` plus the averaged value of
//! `rollouts` simulated continuations. A continuation spawns a random tile and
//! greedily takes the best next move, `depth` times. No-op directions score
//! [`NO_OP_SCORE`] and are never chosen; a grid where every direction is a
//! no-op yields `None` (game over).
//!
//! Quick start
//! ```
//! use slide_2048::engine::Grid;
//! use slide_2048::lookahead::{Lookahead, LookaheadConfig, LookaheadParallel};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let g = Grid::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
//!
//! let mut seq = Lookahead::with_config(LookaheadConfig::default().with_rollouts(8));
//! assert!(seq.best_move(g, &mut rng).is_some());
//!
//! let mut par = LookaheadParallel::new();
//! assert!(par.best_move(g, &mut rng).is_some());
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::{Grid, Move};
use crate::heuristic::{Evaluator, Heuristic};

mod search_par;
mod search_seq;

pub use search_par::LookaheadParallel;
pub use search_seq::Lookahead;

/// Score reported for a direction that does not change the grid.
///
/// No-op branches are also marked `legal = false` and are never chosen, even
/// when an injected evaluator scores every legal outcome below this value.
pub const NO_OP_SCORE: f64 = -10.0;

/// Search knobs.
///
/// - `rollouts`: simulated continuations averaged per candidate move (0 disables refinement).
/// - `depth`: spawn-then-greedy steps per continuation (1 is a single greedy reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookaheadConfig {
    pub rollouts: u32,
    pub depth: u32,
}

impl LookaheadConfig {
    pub fn new() -> Self { Self::default() }

    pub fn with_rollouts(mut self, rollouts: u32) -> Self {
        self.rollouts = rollouts;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl Default for LookaheadConfig {
    fn default() -> Self { Self { rollouts: 20, depth: 1 } }
}

/// Score of one root direction.
///
/// `legal` is false when the move is a no-op for the current grid, in which
/// case `score` is [`NO_OP_SCORE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BranchEval {
    pub dir: Move,
    pub score: f64,
    pub legal: bool,
}

/// Work done by the last search call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    pub rollouts: u64,
    pub evaluations: u64,
}

impl SearchStats {
    fn absorb(&mut self, other: SearchStats) {
        self.rollouts += other.rollouts;
        self.evaluations += other.evaluations;
    }
}

/// Pick a direction for `grid` with the default heuristic and sequential search.
///
/// Returns `None` when no direction changes the grid.
///
/// ```
/// use slide_2048::engine::{Grid, Move};
/// use slide_2048::lookahead::choose_direction;
/// use rand::{rngs::StdRng, SeedableRng};
/// let mut rng = StdRng::seed_from_u64(1);
/// let stuck = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]).unwrap();
/// assert_eq!(choose_direction(stuck, 10, 1, &mut rng), None);
/// ```
pub fn choose_direction<R: Rng + ?Sized>(grid: Grid, rollouts: u32, depth: u32, rng: &mut R) -> Option<Move> {
    let cfg = LookaheadConfig { rollouts, depth };
    Lookahead::with_evaluator(Heuristic, cfg).best_move(grid, rng)
}

/// First legal direction with the highest score; ties go to the lowest index.
pub(crate) fn pick_best(branches: &[BranchEval; 4]) -> Option<Move> {
    let mut best: Option<&BranchEval> = None;
    for branch in branches.iter().filter(|b| b.legal) {
        if best.map_or(true, |cur| branch.score > cur.score) {
            best = Some(branch);
        }
    }
    best.map(|b| b.dir)
}

/// One-ply greedy reply: the best changed outcome and its evaluation.
pub(crate) fn greedy_step<E: Evaluator + ?Sized>(evaluator: &E, grid: Grid, stats: &mut SearchStats) -> Option<(Grid, f64)> {
    let mut best: Option<(Grid, f64)> = None;
    for dir in Move::ALL {
        let outcome = grid.apply(dir);
        if !outcome.changed {
            continue;
        }
        let score = evaluator.evaluate(&outcome.grid);
        stats.evaluations += 1;
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((outcome.grid, score));
        }
    }
    best
}

/// Play one simulated continuation from `start`, returning the summed evaluations.
pub(crate) fn rollout<E, R>(evaluator: &E, start: Grid, depth: u32, rng: &mut R, stats: &mut SearchStats) -> f64
where
    E: Evaluator + ?Sized,
    R: Rng + ?Sized,
{
    stats.rollouts += 1;
    let mut grid = start;
    let mut total = 0.0;
    for _ in 0..depth {
        let spawned = grid.with_random_tile(rng);
        match greedy_step(evaluator, spawned, stats) {
            Some((next, score)) => {
                total += score;
                grid = next;
            }
            None => break,
        }
    }
    total
}
