//! Rule-of-thumb position evaluator used by the rule-based and lookahead agents.
//!
//! The score is the sum of six independent terms, each computed from the
//! unmodified grid. Every term is exposed on its own so it can be checked in
//! isolation.

use serde::Serialize;

use crate::engine::{Grid, SIZE, WIN_TILE};

const EMPTY_WEIGHT: f64 = 110.0;
const MONOTONICITY_WEIGHT: f64 = 5.0;
const ADJACENCY_WEIGHT: f64 = 5.0;
const CORNER_BASE: f64 = 180.0;
const CORNER_STEP: f64 = 120.0;
const CORNER_WEIGHT: f64 = 1.5;
const WIN_BONUS: f64 = 1000.0;

/// Minimum values required, in order, to extend the bottom-left staircase.
const STAIRCASE: [(usize, usize, u32); 4] = [(2, 0, 256), (1, 0, 128), (0, 0, 64), (0, 1, 64)];

/// Anything that can rank a grid; higher is better.
pub trait Evaluator {
    fn evaluate(&self, grid: &Grid) -> f64;
}

impl<F: Fn(&Grid) -> f64> Evaluator for F {
    fn evaluate(&self, grid: &Grid) -> f64 { self(grid) }
}

/// The six-term hand-tuned heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Heuristic;

impl Heuristic {
    /// Every term of the evaluation, for diagnostics.
    pub fn breakdown(&self, grid: &Grid) -> Breakdown {
        Breakdown {
            emptiness: emptiness(grid),
            monotonicity: monotonicity(grid),
            mass: mass(grid),
            adjacency: adjacency(grid),
            corner: corner_bonus(grid),
            win: win_bonus(grid),
        }
    }
}

impl Evaluator for Heuristic {
    #[inline]
    fn evaluate(&self, grid: &Grid) -> f64 { evaluate(grid) }
}

/// Per-term evaluation of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Breakdown {
    pub emptiness: f64,
    pub monotonicity: f64,
    pub mass: f64,
    pub adjacency: f64,
    pub corner: f64,
    pub win: f64,
}

impl Breakdown {
    pub fn total(&self) -> f64 {
        self.emptiness + self.monotonicity + self.mass + self.adjacency + self.corner + self.win
    }
}

/// Score a grid with the default heuristic.
///
/// ```
/// use slide_2048::engine::Grid;
/// use slide_2048::heuristic;
/// let g = Grid::new([[0; 4], [0; 4], [0; 4], [4, 0, 0, 0]]).unwrap();
/// assert!(heuristic::evaluate(&g) > heuristic::evaluate(&Grid::new([[4, 2, 0, 0], [0; 4], [0; 4], [2, 0, 0, 0]]).unwrap()));
/// ```
pub fn evaluate(grid: &Grid) -> f64 {
    emptiness(grid) + monotonicity(grid) + mass(grid) + adjacency(grid) + corner_bonus(grid) + win_bonus(grid)
}

/// 110 per empty cell.
pub fn emptiness(grid: &Grid) -> f64 {
    grid.count_empty() as f64 * EMPTY_WEIGHT
}

/// Rewards columns that grow downward and rows that shrink rightward.
///
/// A column pair at rows (i, i+1) adds `i` when the lower cell is at least the
/// upper one; a row pair at columns (j, j+1) adds `4 - j` when the right cell
/// is at most the left one. Equal pairs, empty ones included, count.
pub fn monotonicity(grid: &Grid) -> f64 {
    let g = grid.rows();
    let mut columns = 0usize;
    for j in 0..SIZE {
        for i in 0..SIZE - 1 {
            if g[i + 1][j] >= g[i][j] {
                columns += i;
            }
        }
    }
    let mut rows = 0usize;
    for row in g {
        for j in 0..SIZE - 1 {
            if row[j + 1] <= row[j] {
                rows += SIZE - j;
            }
        }
    }
    (columns + rows) as f64 * MONOTONICITY_WEIGHT
}

/// Half the total of all tiles.
pub fn mass(grid: &Grid) -> f64 {
    grid.sum() as f64 / 2.0
}

/// Merge potential along rows: the value of every horizontally adjacent equal pair, times 5.
pub fn adjacency(grid: &Grid) -> f64 {
    let total: u64 = grid
        .rows()
        .iter()
        .flat_map(|row| row.windows(2))
        .filter(|pair| pair[0] == pair[1])
        .map(|pair| u64::from(pair[0]))
        .sum();
    total as f64 * ADJACENCY_WEIGHT
}

/// Staircase bonus for keeping the largest tile in the bottom-left corner.
///
/// Only the first maximal cell in row-major order counts as "the" maximum.
pub fn corner_bonus(grid: &Grid) -> f64 {
    let g = grid.rows();
    if grid.max_cell() != (SIZE - 1, 0) {
        return 0.0;
    }
    let steps = STAIRCASE
        .iter()
        .take_while(|&&(r, c, min)| g[r][c] >= min)
        .count();
    (CORNER_BASE + steps as f64 * CORNER_STEP) * CORNER_WEIGHT
}

/// 1000 once a 2048 tile is on the board.
pub fn win_bonus(grid: &Grid) -> f64 {
    if grid.cells().any(|v| v == WIN_TILE) { WIN_BONUS } else { 0.0 }
}
