//! The formula seam: a `Formula` trait implemented by the concrete
//! arithmetic language in [`crate::ast`], and the `CellLookup` callback a
//! sheet supplies so formulas can read other cells without depending on the
//! sheet crate.

use std::fmt;

use thiserror::Error;

use crate::position::Position;
use crate::value::{FormulaError, Value};

/// Diagnostic returned when `text` cannot be parsed as a formula.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum FormulaParseError {
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: String },
    #[error("invalid cell reference {0:?}")]
    InvalidReference(String),
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("trailing input {0:?}")]
    TrailingInput(String),
}

/// Read-only access to other cells' evaluated values, supplied by the sheet.
pub trait CellLookup {
    fn value(&self, pos: Position) -> Value;
}

/// A parsed, evaluable formula. Implementations own their own AST; the cell
/// that holds one never inspects its internals directly.
pub trait Formula: fmt::Debug {
    /// Evaluate against `lookup`, which resolves references to other cells'
    /// values. Returns the numeric result, or the error category to store.
    fn evaluate(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError>;

    /// The parser's re-emission of the parsed expression, used as the
    /// cell's stored text after the leading `=`.
    fn canonical_text(&self) -> String;

    /// Positions this formula reads, in traversal order with duplicates
    /// allowed (the cell that owns this formula deduplicates).
    fn references(&self) -> &[Position];
}

/// Parse `text` (excluding the leading `=`) into an evaluable formula.
pub fn parse(text: &str) -> Result<Box<dyn Formula>, FormulaParseError> {
    let expr = crate::parser::parse_expression(text)?;
    Ok(Box::new(expr))
}
