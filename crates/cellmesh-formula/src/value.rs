//! The formula value model: a number, a string, or an error category.

use std::fmt;

use thiserror::Error;

/// An evaluation failure, surfaced as a [`Value::Error`] rather than as a
/// thrown exception. Carries no heap data, so it is cheap to copy around.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum FormulaError {
    /// A reference to an invalid position, or to a cell whose text cannot
    /// be coerced into a number where one was required.
    #[error("#REF!")]
    Ref,
    /// A structural evaluation problem, e.g. a formula cell with no parsed
    /// formula attached.
    #[error("#VALUE!")]
    Value,
    /// Division by zero or a non-finite intermediate result.
    #[error("#ARITHM!")]
    Arithmetic,
}

/// A cell's evaluated value: a number, displayable text, or an error tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Value {
    pub fn error(category: FormulaError) -> Value {
        Value::Error(category)
    }

    /// The number backing this value, coercing text by parsing it and
    /// mapping unparseable text or an existing error to `FormulaError::Ref`
    /// the way a formula that reads a non-numeric cell would.
    pub fn as_number(&self) -> Result<f64, FormulaError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) => s.trim().parse::<f64>().map_err(|_| FormulaError::Ref),
            Value::Error(e) => Err(*e),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Error(e) => write!(f, "{e}"),
        }
    }
}
