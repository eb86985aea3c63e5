//! Error types for the cellmesh sheet engine.

use cellmesh_formula::{FormulaParseError, Position};
use thiserror::Error;

/// Failures that cross the [`crate::Sheet`] boundary.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("invalid position ({row}, {col})", row = .0.row, col = .0.col)]
    InvalidPosition(Position),

    #[error("circular dependency introduced while writing {0}")]
    CircularDependency(Position),

    #[error("formula parse error: {0}")]
    FormulaParse(#[from] FormulaParseError),
}

pub type Result<T> = std::result::Result<T, SheetError>;
