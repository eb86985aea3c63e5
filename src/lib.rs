//! Cellmesh: an in-memory spreadsheet evaluation engine.
//!
//! This is a thin facade over [`cellmesh_core`] and [`cellmesh_formula`],
//! re-exporting the pieces most callers need (`Sheet`, `Position`, `Value`,
//! `SheetError`) so downstream crates can depend on `cellmesh` directly
//! while still reaching the underlying crates for deeper integration.

pub use cellmesh_core::{
    parse_formula, CellHandle, CellLookup, Formula, FormulaError, FormulaParseError, Position,
    Result, Sheet, SheetError, Size, Value,
};

pub use cellmesh_formula as formula;
