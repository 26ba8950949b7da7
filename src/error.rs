use thiserror::Error;

/// Contract violations reported by the engine's validating constructors and parsers.
///
/// A well-formed [`Grid`](crate::engine::Grid) can never produce one of these;
/// they only surface at the boundary where raw input is turned into engine types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("grid must be 4x4, got {rows} rows with {cols} columns")]
    InvalidShape { rows: usize, cols: usize },

    #[error("cell ({row}, {col}) holds {value}, expected 0 or a power of two between 2 and 131072")]
    InvalidValue { row: usize, col: usize, value: i64 },

    #[error("cell ({row}, {col}) holds log2 exponent {exponent}, expected 0..=17")]
    InvalidExponent { row: usize, col: usize, exponent: u8 },

    #[error("unknown direction: {0:?}")]
    UnknownDirection(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
