use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Side length of the board.
pub const SIZE: usize = 4;

/// Largest tile reachable on a 4x4 board (2^17).
pub const MAX_TILE: u32 = 1 << 17;

/// Tile value that wins the game.
pub const WIN_TILE: u32 = 2048;

type Rows = [[u32; SIZE]; SIZE];
type Line = [u32; SIZE];

/// A direction to slide/merge tiles.
///
/// Variants are declared in index order; ties between equally scored
/// directions are broken toward the lowest index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Left,
    Right,
    Up,
    Down,
}

impl Move {
    /// All directions in index order.
    pub const ALL: [Move; 4] = [Move::Left, Move::Right, Move::Up, Move::Down];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Move::Left => 0,
            Move::Right => 1,
            Move::Up => 2,
            Move::Down => 3,
        }
    }

    /// Map an action index (0..4) back to a direction.
    ///
    /// ```
    /// use slide_2048::engine::Move;
    /// assert_eq!(Move::from_index(3).unwrap(), Move::Down);
    /// assert!(Move::from_index(4).is_err());
    /// ```
    pub fn from_index(idx: usize) -> Result<Move> {
        Move::ALL
            .get(idx)
            .copied()
            .ok_or_else(|| EngineError::UnknownDirection(idx.to_string()))
    }

    fn orientation(self) -> Orientation {
        match self {
            Move::Left => Orientation::Identity,
            Move::Right => Orientation::Mirrored,
            Move::Up => Orientation::Transposed,
            Move::Down => Orientation::TransposedFlipped,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Left => "left",
            Move::Right => "right",
            Move::Up => "up",
            Move::Down => "down",
        };
        f.write_str(name)
    }
}

impl FromStr for Move {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Move::Left),
            "right" | "r" => Ok(Move::Right),
            "up" | "u" => Ok(Move::Up),
            "down" | "d" => Ok(Move::Down),
            _ => Err(EngineError::UnknownDirection(s.to_string())),
        }
    }
}

/// Result of sliding a grid in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub grid: Grid,
    /// Sum of every tile produced by a merge during this move.
    pub score_delta: u64,
    /// False when the move left every cell untouched.
    pub changed: bool,
}

/// A 4x4 2048 board holding raw tile values (0 for empty, then 2, 4, 8, ...).
///
/// Grids are plain values: every operation returns a new grid and leaves
/// `self` untouched. The log2 encoding used by training code is only
/// available through the explicit [`Grid::to_log2`] / [`Grid::from_log2`]
/// conversions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Rows", into = "Rows")]
pub struct Grid(Rows);

impl Grid {
    /// A constant empty grid (all zeros).
    pub const EMPTY: Grid = Grid([[0; SIZE]; SIZE]);

    /// Build a grid from raw tile values, rejecting anything that is not 0 or a tile.
    ///
    /// ```
    /// use slide_2048::engine::Grid;
    /// let g = Grid::new([[0, 0, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0], [2, 2, 0, 0]]).unwrap();
    /// assert_eq!(g.count_empty(), 14);
    /// assert!(Grid::new([[3, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).is_err());
    /// ```
    pub fn new(rows: Rows) -> Result<Self> {
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if !is_tile_value(value) {
                    return Err(EngineError::InvalidValue { row: r, col: c, value: i64::from(value) });
                }
            }
        }
        Ok(Grid(rows))
    }

    /// Build a grid from the log2 view (0 empty, 1 for a 2-tile, 2 for a 4-tile, ...).
    pub fn from_log2(exponents: [[u8; SIZE]; SIZE]) -> Result<Self> {
        let mut rows = [[0u32; SIZE]; SIZE];
        for (r, row) in exponents.iter().enumerate() {
            for (c, &exponent) in row.iter().enumerate() {
                if exponent > MAX_TILE.trailing_zeros() as u8 {
                    return Err(EngineError::InvalidExponent { row: r, col: c, exponent });
                }
                rows[r][c] = if exponent == 0 { 0 } else { 1 << exponent };
            }
        }
        Ok(Grid(rows))
    }

    /// Convert to the log2 view.
    pub fn to_log2(&self) -> [[u8; SIZE]; SIZE] {
        self.0.map(|row| row.map(log2_of))
    }

    /// Flat, row-major log2 view of the board, the observation fed to learning agents.
    pub fn observation(&self) -> [u8; SIZE * SIZE] {
        let mut out = [0u8; SIZE * SIZE];
        for (slot, value) in out.iter_mut().zip(self.cells()) {
            *slot = log2_of(value);
        }
        out
    }

    /// Borrow the rows.
    #[inline]
    pub fn rows(&self) -> &Rows { &self.0 }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u32 { self.0[row][col] }

    /// Row-major iterator over every cell value.
    pub fn cells(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    /// Return the outcome of sliding/merging tiles toward `dir` (no random insert).
    ///
    /// ```
    /// use slide_2048::engine::{Grid, Move};
    /// let g = Grid::new([[0; 4], [0; 4], [0; 4], [2, 2, 2, 0]]).unwrap();
    /// let out = g.apply(Move::Left);
    /// assert_eq!(out.grid.rows()[3], [4, 2, 0, 0]);
    /// assert_eq!(out.score_delta, 4);
    /// assert!(out.changed);
    /// ```
    pub fn apply(self, dir: Move) -> MoveOutcome {
        let orientation = dir.orientation();
        let view = orientation.forward(self.0);
        let mut slid = [[0u32; SIZE]; SIZE];
        let mut score_delta = 0;
        for (dst, &row) in slid.iter_mut().zip(view.iter()) {
            let (line, gained) = slide_left(row);
            *dst = line;
            score_delta += gained;
        }
        let grid = Grid(orientation.inverse(slid));
        MoveOutcome { grid, score_delta, changed: grid != self }
    }

    /// Insert a 2 (75%) or 4 (25%) tile into a uniformly chosen empty cell.
    ///
    /// A full grid is returned unchanged.
    ///
    /// ```
    /// use slide_2048::engine::Grid;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let g = Grid::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(g.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        let empty = self.empty_cells();
        if empty.is_empty() {
            return self;
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        let mut rows = self.0;
        rows[row][col] = generate_random_tile(rng);
        Grid(rows)
    }

    /// Apply `dir`, then insert a random tile if the move changed the grid.
    ///
    /// The returned outcome carries the spawned grid; `score_delta` and
    /// `changed` describe the slide itself.
    pub fn make_move<R: Rng + ?Sized>(self, dir: Move, rng: &mut R) -> MoveOutcome {
        let outcome = self.apply(dir);
        if outcome.changed {
            MoveOutcome { grid: outcome.grid.with_random_tile(rng), ..outcome }
        } else {
            outcome
        }
    }

    /// Directions that change the grid, in index order.
    pub fn legal_moves(&self) -> Vec<Move> {
        Move::ALL.into_iter().filter(|&dir| self.apply(dir).changed).collect()
    }

    /// Return true if no direction changes the grid.
    ///
    /// ```
    /// use slide_2048::engine::Grid;
    /// // Nothing can slide on an empty grid until a tile is spawned.
    /// assert!(Grid::EMPTY.is_game_over());
    /// ```
    #[inline]
    pub fn is_game_over(&self) -> bool { is_game_over(*self) }

    /// Coordinates of every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::with_capacity(SIZE * SIZE);
        for (r, row) in self.0.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                if value == 0 {
                    out.push((r, c));
                }
            }
        }
        out
    }

    #[inline]
    pub fn count_empty(&self) -> usize { self.cells().filter(|&v| v == 0).count() }

    /// Highest tile value on the board (0 for an empty grid).
    #[inline]
    pub fn highest_tile(&self) -> u32 { self.cells().max().unwrap_or(0) }

    /// Position of the first maximal cell in row-major order ((0, 0) for an empty grid).
    pub fn max_cell(&self) -> (usize, usize) {
        let mut best = (0, 0);
        let mut best_val = 0;
        for (idx, value) in self.cells().enumerate() {
            if value > best_val {
                best_val = value;
                best = (idx / SIZE, idx % SIZE);
            }
        }
        best
    }

    /// Sum of all tile values.
    #[inline]
    pub fn sum(&self) -> u64 { self.cells().map(u64::from).sum() }

    /// True once a 2048 tile is on the board.
    #[inline]
    pub fn has_won(&self) -> bool { self.cells().any(|v| v == WIN_TILE) }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid({:?})", self.0)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for (r, row) in self.0.iter().enumerate() {
            if r > 0 {
                writeln!(f, "-------------------------------")?;
            }
            let cells: Vec<String> = row.iter().map(|&v| format_val(v)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

impl TryFrom<Rows> for Grid {
    type Error = EngineError;

    fn try_from(rows: Rows) -> Result<Self> { Grid::new(rows) }
}

impl From<Grid> for Rows {
    fn from(grid: Grid) -> Self { grid.0 }
}

/// Accept loosely shaped input (e.g. parsed from a harness), checking shape and values.
impl TryFrom<Vec<Vec<i64>>> for Grid {
    type Error = EngineError;

    fn try_from(rows: Vec<Vec<i64>>) -> Result<Self> {
        if rows.len() != SIZE {
            let cols = rows.first().map_or(0, Vec::len);
            return Err(EngineError::InvalidShape { rows: rows.len(), cols });
        }
        if let Some(bad) = rows.iter().find(|row| row.len() != SIZE) {
            return Err(EngineError::InvalidShape { rows: rows.len(), cols: bad.len() });
        }
        let mut out = [[0u32; SIZE]; SIZE];
        for (r, row) in rows.iter().enumerate() {
            for (c, &value) in row.iter().enumerate() {
                out[r][c] = u32::try_from(value)
                    .ok()
                    .filter(|&v| is_tile_value(v))
                    .ok_or(EngineError::InvalidValue { row: r, col: c, value })?;
            }
        }
        Ok(Grid(out))
    }
}

/// Slide/merge `grid` toward `dir`. No randomness.
#[inline]
pub fn apply(grid: Grid, dir: Move) -> MoveOutcome { grid.apply(dir) }

/// True if no move in any direction changes the grid.
pub fn is_game_over(grid: Grid) -> bool {
    Move::ALL.into_iter().all(|dir| !grid.apply(dir).changed)
}

/// How a direction's view of the grid relates to the canonical left slide.
#[derive(Debug, Clone, Copy)]
enum Orientation {
    Identity,
    Mirrored,
    Transposed,
    TransposedFlipped,
}

impl Orientation {
    fn forward(self, rows: Rows) -> Rows {
        match self {
            Orientation::Identity => rows,
            Orientation::Mirrored => mirror(rows),
            Orientation::Transposed => transpose(rows),
            Orientation::TransposedFlipped => transpose(flip(rows)),
        }
    }

    fn inverse(self, rows: Rows) -> Rows {
        match self {
            Orientation::Identity => rows,
            Orientation::Mirrored => mirror(rows),
            Orientation::Transposed => transpose(rows),
            Orientation::TransposedFlipped => flip(transpose(rows)),
        }
    }
}

fn transpose(rows: Rows) -> Rows {
    let mut out = [[0u32; SIZE]; SIZE];
    for (r, row) in rows.iter().enumerate() {
        for (c, &value) in row.iter().enumerate() {
            out[c][r] = value;
        }
    }
    out
}

/// Reverse the columns of every row.
fn mirror(rows: Rows) -> Rows {
    rows.map(|mut row| {
        row.reverse();
        row
    })
}

/// Reverse the order of the rows.
fn flip(mut rows: Rows) -> Rows {
    rows.reverse();
    rows
}

/// Move non-zero tiles to the front, keeping their relative order.
fn compact(line: Line) -> Line {
    let mut out = [0u32; SIZE];
    for (slot, value) in out.iter_mut().zip(line.into_iter().filter(|&v| v != 0)) {
        *slot = value;
    }
    out
}

/// Slide one line toward index 0, returning the new line and the merge score.
fn slide_left(line: Line) -> (Line, u64) {
    let mut line = compact(line);
    let filled = line.iter().take_while(|&&v| v != 0).count();
    let mut score = 0;
    let mut i = 0;
    // `filled` is fixed up front; each merge shifts the tail so a doubled cell is never revisited.
    while i + 1 < filled {
        if line[i] != 0 && line[i] == line[i + 1] {
            line[i] *= 2;
            score += u64::from(line[i]);
            line.copy_within(i + 2.., i + 1);
            line[SIZE - 1] = 0;
        }
        i += 1;
    }
    (line, score)
}

fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    if rng.gen_range(0..4) < 3 { 2 } else { 4 }
}

#[inline]
fn is_tile_value(value: u32) -> bool {
    value == 0 || (value >= 2 && value <= MAX_TILE && value.is_power_of_two())
}

#[inline]
fn log2_of(value: u32) -> u8 {
    if value == 0 { 0 } else { value.trailing_zeros() as u8 }
}

fn format_val(val: u32) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}
