//! Error types for the resolver library.

use crate::grid::Pos;
use crate::rules::RulesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("position {pos} is outside the {rows}x{cols} board")]
    OutOfBounds { pos: Pos, rows: usize, cols: usize },
    #[error("cascade did not settle within {passes} passes")]
    CascadeDepth { passes: usize },
    #[error("no run-free layout found after {attempts} attempts")]
    NoSettledLayout { attempts: usize },
    #[error("invalid layout: {0}")]
    Layout(String),
    #[error(transparent)]
    Rules(#[from] RulesError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
