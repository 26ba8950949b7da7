use log::{debug, trace};
use rand::Rng;

use crate::engine::{Grid, Move};
use crate::heuristic::{Evaluator, Heuristic};

use super::{pick_best, rollout, BranchEval, LookaheadConfig, SearchStats, NO_OP_SCORE};

/// Single-threaded lookahead search.
///
/// The evaluator is injected at construction and the random source on every
/// call, so a seeded RNG makes the search fully reproducible.
pub struct Lookahead<E = Heuristic> {
    evaluator: E,
    cfg: LookaheadConfig,
    stats: SearchStats,
}

impl Lookahead<Heuristic> {
    pub fn new() -> Self { Self::with_config(LookaheadConfig::default()) }

    pub fn with_config(cfg: LookaheadConfig) -> Self { Self::with_evaluator(Heuristic, cfg) }
}

impl<E: Evaluator> Lookahead<E> {
    pub fn with_evaluator(evaluator: E, cfg: LookaheadConfig) -> Self {
        Self { evaluator, cfg, stats: SearchStats::default() }
    }

    #[inline]
    pub fn config(&self) -> &LookaheadConfig { &self.cfg }

    /// Compute the best direction, or `None` when no move is legal.
    ///
    /// ```
    /// use slide_2048::engine::{Grid, Move};
    /// use slide_2048::lookahead::Lookahead;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(7);
    /// // Every tile already sits on the right edge, so Right is a no-op.
    /// let g = Grid::new([[0, 0, 0, 2], [0, 0, 0, 4], [0, 0, 0, 8], [0, 0, 0, 16]]).unwrap();
    /// let mut la = Lookahead::new();
    /// assert_ne!(la.best_move(g, &mut rng), Some(Move::Right));
    /// ```
    pub fn best_move<R: Rng + ?Sized>(&mut self, grid: Grid, rng: &mut R) -> Option<Move> {
        let branches = self.branch_evals(grid, rng);
        let best = pick_best(&branches);
        debug!("lookahead chose {:?} (rollouts: {}, evaluations: {})", best, self.stats.rollouts, self.stats.evaluations);
        best
    }

    /// Score every direction.
    ///
    /// Returns a fixed array in index order `[Left, Right, Up, Down]` and
    /// marks no-op moves as `legal=false`.
    pub fn branch_evals<R: Rng + ?Sized>(&mut self, grid: Grid, rng: &mut R) -> [BranchEval; 4] {
        let mut stats = SearchStats::default();
        let out = Move::ALL.map(|dir| {
            let outcome = grid.apply(dir);
            if !outcome.changed {
                return BranchEval { dir, score: NO_OP_SCORE, legal: false };
            }
            let base = self.evaluator.evaluate(&outcome.grid);
            stats.evaluations += 1;
            let refined = self.refine(outcome.grid, rng, &mut stats);
            trace!("{dir}: base {base:.1}, rollout {refined:.1}");
            BranchEval { dir, score: base + refined, legal: true }
        });
        self.stats = stats;
        out
    }

    /// Statistics collected from the last call to [`Self::best_move`] or [`Self::branch_evals`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats { self.stats }

    /// Reset stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) { self.stats = SearchStats::default(); }

    fn refine<R: Rng + ?Sized>(&self, outcome: Grid, rng: &mut R, stats: &mut SearchStats) -> f64 {
        let LookaheadConfig { rollouts, depth } = self.cfg;
        if rollouts == 0 || depth == 0 {
            return 0.0;
        }
        let total: f64 = (0..rollouts)
            .map(|_| rollout(&self.evaluator, outcome, depth, &mut *rng, stats))
            .sum();
        total / f64::from(rollouts)
    }
}

impl Default for Lookahead<Heuristic> { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn grid(rows: [[u32; 4]; 4]) -> Grid { Grid::new(rows).unwrap() }

    #[test]
    fn test_no_op_branches_score_penalty() {
        let g = grid([[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut la = Lookahead::with_config(LookaheadConfig::default().with_rollouts(0));
        let branches = la.branch_evals(g, &mut StdRng::seed_from_u64(0));
        assert_eq!(branches[Move::Left.index()], BranchEval { dir: Move::Left, score: NO_OP_SCORE, legal: false });
        assert_eq!(branches[Move::Up.index()].score, NO_OP_SCORE);
        assert!(branches[Move::Right.index()].legal);
        assert!(branches[Move::Down.index()].legal);
    }

    #[test]
    fn test_without_rollouts_scores_are_evaluations() {
        let g = grid([[0, 2, 0, 0], [0; 4], [4, 0, 0, 0], [2, 0, 0, 0]]);
        let mut la = Lookahead::with_config(LookaheadConfig::default().with_rollouts(0));
        let branches = la.branch_evals(g, &mut StdRng::seed_from_u64(0));
        for b in branches.iter().filter(|b| b.legal) {
            assert_eq!(b.score, crate::heuristic::evaluate(&g.apply(b.dir).grid));
        }
        assert_eq!(la.last_stats().rollouts, 0);
    }

    #[test]
    fn test_terminal_grid_has_no_move() {
        let stuck = grid([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut la = Lookahead::new();
        assert_eq!(la.best_move(stuck, &mut StdRng::seed_from_u64(3)), None);
        assert!(la.branch_evals(stuck, &mut StdRng::seed_from_u64(3)).iter().all(|b| !b.legal));
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let g = grid([[2, 0, 4, 0], [0, 8, 0, 2], [4, 0, 2, 0], [16, 2, 0, 0]]);
        let cfg = LookaheadConfig::default().with_rollouts(16).with_depth(3);
        let a = Lookahead::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(99));
        let b = Lookahead::with_config(cfg).branch_evals(g, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_counts_rollouts() {
        let g = grid([[2, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 2]]);
        let mut la = Lookahead::with_config(LookaheadConfig::default().with_rollouts(5).with_depth(2));
        la.best_move(g, &mut StdRng::seed_from_u64(11));
        // All four directions are legal here.
        assert_eq!(la.last_stats().rollouts, 20);
        la.reset_stats();
        assert_eq!(la.last_stats(), SearchStats::default());
    }

    #[test]
    fn test_injected_evaluator_steers_choice() {
        // Reward tiles in the top-right corner only.
        let top_right = |g: &Grid| f64::from(g.get(0, 3));
        let g = grid([[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut la = Lookahead::with_evaluator(top_right, LookaheadConfig::default().with_rollouts(0));
        assert_eq!(la.best_move(g, &mut StdRng::seed_from_u64(0)), Some(Move::Right));
    }

    #[test]
    fn test_no_op_loses_to_any_legal_score() {
        // Every legal outcome scores far below the no-op penalty; Left and Up still lose.
        let gloomy = |_: &Grid| -1000.0;
        let g = grid([[2, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut la = Lookahead::with_evaluator(gloomy, LookaheadConfig::default().with_rollouts(3));
        let branches = la.branch_evals(g, &mut StdRng::seed_from_u64(0));
        assert!(branches[Move::Right.index()].score < NO_OP_SCORE);
        assert_eq!(la.best_move(g, &mut StdRng::seed_from_u64(0)), Some(Move::Right));
    }

    #[test]
    fn it_takes_the_merge_that_keeps_the_corner() {
        // Merging the 1024s leftward completes 2048 in the bottom-left corner.
        let g = grid([[0; 4], [2, 0, 0, 0], [4, 0, 0, 0], [1024, 1024, 0, 0]]);
        let mut la = Lookahead::with_config(LookaheadConfig::default().with_rollouts(8).with_depth(1));
        assert_eq!(la.best_move(g, &mut StdRng::seed_from_u64(5)), Some(Move::Left));
    }
}
