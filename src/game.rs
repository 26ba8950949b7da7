//! Caller-side game session: owns the board, the running score and tile spawning.
//!
//! The engine itself never spawns tiles; [`Game`] is the collaborator that
//! does, adding one random tile after every move that changed the board.

use log::{debug, info, warn};
use rand::{Rng, RngCore};
use serde::Serialize;

use crate::engine::{Grid, Move, MoveOutcome, SIZE, WIN_TILE};
use crate::error::Result;
use crate::policy::Policy;

/// Number of tiles placed on a fresh board.
pub const START_TILES: usize = 2;

/// One transition as seen by a learning agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Step {
    /// Flat log2 view of the board after the move (and spawn).
    pub observation: [u8; SIZE * SIZE],
    /// Score gained by the move.
    pub reward: u64,
    /// True once no direction can change the board.
    pub done: bool,
    pub changed: bool,
}

/// Final state of a finished (or capped) game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub score: u64,
    pub moves: u32,
    pub highest_tile: u32,
    pub won: bool,
    /// False when the game stopped on the move cap rather than on game over.
    pub finished: bool,
}

/// A running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    grid: Grid,
    score: u64,
    high_score: u64,
    moves: u32,
}

impl Game {
    /// Start a game with [`START_TILES`] random tiles.
    ///
    /// ```
    /// use slide_2048::game::Game;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(4);
    /// let game = Game::new(&mut rng);
    /// assert_eq!(game.grid().count_empty(), 14);
    /// assert_eq!(game.score(), 0);
    /// ```
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut game = Game { grid: Grid::EMPTY, score: 0, high_score: 0, moves: 0 };
        game.reset(rng);
        game
    }

    /// Resume from an existing position.
    pub fn from_grid(grid: Grid, score: u64) -> Self {
        Game { grid, score, high_score: score, moves: 0 }
    }

    /// Clear the board and score, keeping the high score.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> [u8; SIZE * SIZE] {
        self.grid = (0..START_TILES).fold(Grid::EMPTY, |g, _| g.with_random_tile(&mut *rng));
        self.score = 0;
        self.moves = 0;
        self.grid.observation()
    }

    #[inline]
    pub fn grid(&self) -> Grid { self.grid }

    #[inline]
    pub fn score(&self) -> u64 { self.score }

    #[inline]
    pub fn high_score(&self) -> u64 { self.high_score }

    /// Number of moves that changed the board.
    #[inline]
    pub fn moves(&self) -> u32 { self.moves }

    #[inline]
    pub fn is_over(&self) -> bool { self.grid.is_game_over() }

    /// Slide toward `dir`; if anything moved, bank the score and spawn a tile.
    ///
    /// A no-op move leaves the game untouched.
    pub fn play<R: Rng + ?Sized>(&mut self, dir: Move, rng: &mut R) -> MoveOutcome {
        let outcome = self.grid.make_move(dir, rng);
        if !outcome.changed {
            debug!("{dir} is a no-op, nothing spawned");
            return outcome;
        }
        self.grid = outcome.grid;
        self.score += outcome.score_delta;
        self.high_score = self.high_score.max(self.score);
        self.moves += 1;
        if self.grid.is_game_over() {
            info!("game over after {} moves, score {}, highest tile {}", self.moves, self.score, self.grid.highest_tile());
        }
        outcome
    }

    /// Let `policy` play until no move is legal or `max_moves` is reached.
    ///
    /// `on_move` sees the game after every applied move.
    ///
    /// ```
    /// use slide_2048::game::Game;
    /// use slide_2048::policy::RandomPolicy;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(9);
    /// let mut game = Game::new(&mut rng);
    /// let summary = game.play_out(&mut RandomPolicy, &mut rng, Some(10), |_, _| {});
    /// assert_eq!(summary.moves, 10);
    /// ```
    pub fn play_out<F>(&mut self, policy: &mut dyn Policy, rng: &mut dyn RngCore, max_moves: Option<u32>, mut on_move: F) -> Summary
    where
        F: FnMut(&Game, Move),
    {
        while max_moves.map_or(true, |cap| self.moves < cap) {
            let Some(dir) = policy.choose(&self.grid, rng) else { break };
            if !self.play(dir, &mut *rng).changed {
                warn!("{} chose no-op {dir}, stopping", policy.name());
                break;
            }
            on_move(self, dir);
        }
        self.summary()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            score: self.score,
            moves: self.moves,
            highest_tile: self.grid.highest_tile(),
            won: self.grid.highest_tile() >= WIN_TILE,
            finished: self.is_over(),
        }
    }

    /// Training-harness transition: action index 0..4 is Left, Right, Up, Down.
    ///
    /// Unknown action indices are rejected instead of being treated as a no-op.
    ///
    /// ```
    /// use slide_2048::game::Game;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(4);
    /// let mut game = Game::new(&mut rng);
    /// assert!(game.step(7, &mut rng).is_err());
    /// ```
    pub fn step<R: Rng + ?Sized>(&mut self, action: usize, rng: &mut R) -> Result<Step> {
        let dir = Move::from_index(action)?;
        let outcome = self.play(dir, rng);
        Ok(Step {
            observation: self.grid.observation(),
            reward: outcome.score_delta,
            done: self.grid.is_game_over(),
            changed: outcome.changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::policy::RandomPolicy;
    use rand::{rngs::StdRng, SeedableRng};

    fn grid(rows: [[u32; 4]; 4]) -> Grid { Grid::new(rows).unwrap() }

    #[test]
    fn test_play_banks_score_and_spawns() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut game = Game::from_grid(grid([[0; 4], [0; 4], [0; 4], [2, 2, 0, 0]]), 0);
        let out = game.play(Move::Left, &mut rng);
        assert_eq!(out.score_delta, 4);
        assert_eq!(game.score(), 4);
        assert_eq!(game.high_score(), 4);
        assert_eq!(game.moves(), 1);
        assert_eq!(game.grid().get(3, 0), 4);
        // One merged tile plus one spawned tile.
        assert_eq!(game.grid().count_empty(), 14);
    }

    #[test]
    fn test_no_op_does_not_spawn_or_count() {
        let mut rng = StdRng::seed_from_u64(8);
        let start = grid([[0; 4], [0; 4], [0; 4], [2, 4, 0, 0]]);
        let mut game = Game::from_grid(start, 10);
        let out = game.play(Move::Left, &mut rng);
        assert!(!out.changed);
        assert_eq!(game.grid(), start);
        assert_eq!(game.moves(), 0);
        assert_eq!(game.score(), 10);
    }

    #[test]
    fn test_reset_keeps_high_score() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut game = Game::from_grid(grid([[0; 4], [0; 4], [0; 4], [8, 8, 0, 0]]), 100);
        game.play(Move::Left, &mut rng);
        assert_eq!(game.high_score(), 116);
        let obs = game.reset(&mut rng);
        assert_eq!(game.score(), 0);
        assert_eq!(game.moves(), 0);
        assert_eq!(game.high_score(), 116);
        assert_eq!(obs.iter().filter(|&&e| e != 0).count(), START_TILES);
    }

    #[test]
    fn test_step_reports_transition() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = Game::from_grid(grid([[0; 4], [0; 4], [0; 4], [2, 2, 0, 0]]), 0);
        let step = game.step(Move::Left.index(), &mut rng).unwrap();
        assert_eq!(step.reward, 4);
        assert!(step.changed);
        assert!(!step.done);
        assert_eq!(step.observation[12], 2);
        assert_eq!(step.observation, game.grid().observation());
    }

    #[test]
    fn test_step_rejects_unknown_action() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut game = Game::new(&mut rng);
        let before = game.clone();
        assert_eq!(game.step(4, &mut rng), Err(EngineError::UnknownDirection("4".to_string())));
        assert_eq!(game, before);
    }

    #[test]
    fn test_play_out_runs_to_game_over() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut game = Game::new(&mut rng);
        let mut seen = 0;
        let summary = game.play_out(&mut RandomPolicy, &mut rng, None, |g, _| {
            seen += 1;
            assert_eq!(g.moves(), seen);
        });
        assert!(summary.finished);
        assert!(game.is_over());
        assert_eq!(summary.moves, seen);
        assert_eq!(summary.score, game.score());
        // A stuck full board needs at least two distinct tile values.
        assert!(summary.highest_tile >= 4);
    }

    #[test]
    fn test_step_flags_done() {
        let mut rng = StdRng::seed_from_u64(0);
        // Left merges the last pair; whatever spawns in the freed cell leaves no move.
        let nearly = grid([[4, 8, 4, 8], [8, 4, 8, 4], [4, 8, 4, 8], [8, 2, 2, 8]]);
        let mut game = Game::from_grid(nearly, 0);
        let step = game.step(Move::Left.index(), &mut rng).unwrap();
        assert!(step.changed);
        assert_eq!(step.reward, 4);
        assert_eq!(game.grid().rows()[3][..3], [8, 4, 8]);
        assert_eq!(game.grid().count_empty(), 0);
        assert!(step.done);
        assert!(game.is_over());
    }
}
