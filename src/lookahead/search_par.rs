use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::engine::{Grid, Move};
use crate::heuristic::{Evaluator, Heuristic};

use super::{pick_best, rollout, BranchEval, LookaheadConfig, SearchStats, NO_OP_SCORE};

/// Parallel lookahead using rayon.
///
/// Directions and rollout trials are spread across the rayon pool. Each trial
/// owns a `StdRng` seeded from a per-direction base drawn from the caller's
/// RNG plus the trial index, so a seeded caller gets the same result no
/// matter how the work is scheduled.
pub struct LookaheadParallel<E = Heuristic> {
    evaluator: E,
    cfg: LookaheadConfig,
    stats: SearchStats,
}

impl LookaheadParallel<Heuristic> {
    pub fn new() -> Self { Self::with_config(LookaheadConfig::default()) }

    pub fn with_config(cfg: LookaheadConfig) -> Self { Self::with_evaluator(Heuristic, cfg) }
}

impl<E: Evaluator + Sync> LookaheadParallel<E> {
    pub fn with_evaluator(evaluator: E, cfg: LookaheadConfig) -> Self {
        Self { evaluator, cfg, stats: SearchStats::default() }
    }

    #[inline]
    pub fn config(&self) -> &LookaheadConfig { &self.cfg }

    /// Compute the best direction, or `None` when no move is legal.
    #[inline]
    pub fn best_move<R: Rng + ?Sized>(&mut self, grid: Grid, rng: &mut R) -> Option<Move> {
        self.best_move_with_branches(grid, rng).0
    }

    /// Best direction together with every branch score.
    pub fn best_move_with_branches<R: Rng + ?Sized>(&mut self, grid: Grid, rng: &mut R) -> (Option<Move>, [BranchEval; 4]) {
        let branches = self.branch_evals(grid, rng);
        let best = pick_best(&branches);
        debug!("parallel lookahead chose {:?} (rollouts: {}, evaluations: {})", best, self.stats.rollouts, self.stats.evaluations);
        (best, branches)
    }

    /// Score every direction in parallel.
    ///
    /// Returns a fixed array in index order `[Left, Right, Up, Down]` and
    /// marks no-op moves as `legal=false`.
    pub fn branch_evals<R: Rng + ?Sized>(&mut self, grid: Grid, rng: &mut R) -> [BranchEval; 4] {
        // Seeds are drawn up front, in direction order, to stay independent of scheduling.
        let seeds: [u64; 4] = [rng.gen(), rng.gen(), rng.gen(), rng.gen()];
        let results: Vec<(BranchEval, SearchStats)> = Move::ALL
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(&dir, &seed)| self.eval_branch(grid, dir, seed))
            .collect();
        let mut stats = SearchStats::default();
        let mut out = Move::ALL.map(|dir| BranchEval { dir, score: NO_OP_SCORE, legal: false });
        for (i, (branch, branch_stats)) in results.into_iter().enumerate() {
            out[i] = branch;
            stats.absorb(branch_stats);
        }
        self.stats = stats;
        out
    }

    /// Statistics collected from the last call to [`Self::best_move`] or [`Self::branch_evals`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn eval_branch(&self, grid: Grid, dir: Move, seed: u64) -> (BranchEval, SearchStats) {
        let outcome = grid.apply(dir);
        if !outcome.changed {
            return (BranchEval { dir, score: NO_OP_SCORE, legal: false }, SearchStats::default());
        }
        let base = self.evaluator.evaluate(&outcome.grid);
        let LookaheadConfig { rollouts, depth } = self.cfg;
        let mut stats = SearchStats { rollouts: 0, evaluations: 1 };
        if rollouts == 0 || depth == 0 {
            return (BranchEval { dir, score: base, legal: true }, stats);
        }
        let trials: Vec<(f64, SearchStats)> = (0..rollouts)
            .into_par_iter()
            .map(|trial| {
                let mut trial_rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(trial)));
                let mut trial_stats = SearchStats::default();
                let value = rollout(&self.evaluator, outcome.grid, depth, &mut trial_rng, &mut trial_stats);
                (value, trial_stats)
            })
            .collect();
        // Summed in trial order so the float result does not depend on the split.
        let mut total = 0.0;
        for (value, trial_stats) in trials {
            total += value;
            stats.absorb(trial_stats);
        }
        let score = base + total / f64::from(rollouts);
        (BranchEval { dir, score, legal: true }, stats)
    }
}

impl Default for LookaheadParallel<Heuristic> { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookahead::Lookahead;

    fn grid(rows: [[u32; 4]; 4]) -> Grid { Grid::new(rows).unwrap() }

    #[test]
    fn test_parallel_is_reproducible() {
        let g = grid([[2, 0, 4, 0], [0, 8, 0, 2], [4, 0, 2, 0], [16, 2, 0, 0]]);
        let cfg = LookaheadConfig::default().with_rollouts(32).with_depth(2);
        let a = LookaheadParallel::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(42));
        let b = LookaheadParallel::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_matches_sequential_without_rollouts() {
        let g = grid([[0, 2, 0, 0], [4, 0, 0, 8], [4, 0, 0, 0], [2, 0, 16, 0]]);
        let cfg = LookaheadConfig::default().with_rollouts(0);
        let par = LookaheadParallel::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(1));
        let seq = Lookahead::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(1));
        assert_eq!(par, seq);
    }

    #[test]
    fn test_parallel_terminal_and_stats() {
        let stuck = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut la = LookaheadParallel::new();
        let (best, branches) = la.best_move_with_branches(stuck, &mut StdRng::seed_from_u64(0));
        assert_eq!(best, None);
        assert!(branches.iter().all(|b| !b.legal && b.score == NO_OP_SCORE));
        assert_eq!(la.last_stats(), SearchStats::default());

        let g = grid([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2]]);
        let mut la = LookaheadParallel::with_config(LookaheadConfig::default().with_rollouts(6));
        assert!(la.best_move(g, &mut StdRng::seed_from_u64(0)).is_some());
        assert_eq!(la.last_stats().rollouts, 24);
    }
}
