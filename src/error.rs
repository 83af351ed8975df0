use thiserror::Error;

use crate::grid::Cell;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid state at {cell}: {reason}")]
    InvalidState { cell: Cell, reason: &'static str },

    #[error("no empty cells left to relocate into")]
    Exhausted,
}

pub type SimulationResult<T> = Result<T, SimulationError>;
