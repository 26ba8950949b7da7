//! slide-2048: a 2048 board engine, heuristic evaluator and lookahead agents
//!
//! This crate provides:
//! - A value-type `Grid` of raw tile values with a pure move transform (`engine`)
//! - A six-term position heuristic (`heuristic`)
//! - A Monte-Carlo lookahead search with single-threaded and parallel variants (`lookahead`)
//! - A game session that owns score and tile spawning, plus a training-harness `step` (`game`)
//! - Random, rule-based and lookahead agents behind one trait (`policy`)
//!
//! Quick start:
//! ```
//! use slide_2048::engine::{Grid, Move};
//!
//! let g = Grid::new([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 2, 0, 0]]).unwrap();
//! let out = g.apply(Move::Left);
//! assert_eq!(out.grid.rows()[3], [4, 0, 0, 0]);
//! assert_eq!(out.score_delta, 4);
//! assert!(out.changed);
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use slide_2048::game::Game;
//! use slide_2048::lookahead::{Lookahead, LookaheadConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // 1) Seeded RNG and a cheap lookahead policy
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut search = Lookahead::with_config(LookaheadConfig::default().with_rollouts(4));
//!
//! // 2) Start a game with two random tiles
//! let mut game = Game::new(&mut rng);
//!
//! // 3) Play a few moves (keep doctests fast)
//! while game.moves() < 4 {
//!     match search.best_move(game.grid(), &mut rng) {
//!         Some(dir) => { game.play(dir, &mut rng); }
//!         None => break,
//!     }
//! }
//!
//! // 4) Inspect the final state
//! assert!(game.grid().count_empty() < 16);
//! assert_eq!(game.moves(), 4);
//! ```
//!
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod heuristic;
pub mod lookahead;
pub mod policy;

pub use engine::{Grid, Move, MoveOutcome};
pub use error::{EngineError, Result};
