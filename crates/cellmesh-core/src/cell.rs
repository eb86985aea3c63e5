//! Per-cell state machine: empty, text, or formula, with a lazily computed,
//! cached value and the forward references a formula cell reads.

use std::cell::RefCell;

use cellmesh_formula::{CellLookup, Formula, FormulaParseError, Position, Value};

/// What a cell currently holds.
enum Contents {
    Empty,
    /// Already stripped of a leading `'` escape, if any.
    Text(String),
    Formula(Box<dyn Formula>),
}

/// A single cell in the sheet: its content, its cached evaluation (if any),
/// and the positions its formula reads.
///
/// The cache is interior-mutable (`RefCell`) so that reading a cell's value
/// — which may need to compute and memoize it — does not require exclusive
/// access to the sheet: logically mutable state hanging off an otherwise
/// read-only cell.
pub struct Cell {
    contents: Contents,
    raw_text: String,
    forward_refs: Vec<Position>,
    cached_value: RefCell<Option<Value>>,
}

impl Cell {
    /// A freshly created empty cell.
    pub fn empty() -> Cell {
        Cell {
            contents: Contents::Empty,
            raw_text: String::new(),
            forward_refs: Vec::new(),
            cached_value: RefCell::new(None),
        }
    }

    /// Classify `text` per the cell state table and build the cell.
    ///
    /// | input               | state   |
    /// |---------------------|---------|
    /// | empty                | Empty   |
    /// | starts with `'`      | Text    |
    /// | starts with `=`, len > 1 | Formula |
    /// | otherwise             | Text    |
    pub fn from_input(text: &str) -> Result<Cell, FormulaParseError> {
        if text.is_empty() {
            return Ok(Cell::empty());
        }

        if let Some(rest) = text.strip_prefix('\'') {
            return Ok(Cell {
                contents: Contents::Text(rest.to_string()),
                raw_text: text.to_string(),
                forward_refs: Vec::new(),
                cached_value: RefCell::new(None),
            });
        }

        if text.starts_with('=') && text.len() > 1 {
            let formula = cellmesh_formula::parse(&text[1..])?;
            let raw_text = format!("={}", formula.canonical_text());
            let forward_refs = dedup_preserving_order(formula.references());
            return Ok(Cell {
                contents: Contents::Formula(formula),
                raw_text,
                forward_refs,
                cached_value: RefCell::new(None),
            });
        }

        Ok(Cell {
            contents: Contents::Text(text.to_string()),
            raw_text: text.to_string(),
            forward_refs: Vec::new(),
            cached_value: RefCell::new(None),
        })
    }

    /// The text last written to this cell (for formula cells, `"="`
    /// followed by the canonical re-emission rather than the original
    /// input).
    pub fn text(&self) -> &str {
        &self.raw_text
    }

    /// Positions this cell's formula reads, in stable, deduplicated order.
    /// Empty for non-formula cells.
    pub fn references(&self) -> &[Position] {
        &self.forward_refs
    }

    /// Clear the memoized formula result. A no-op for non-formula cells.
    pub fn invalidate_cache(&self) {
        *self.cached_value.borrow_mut() = None;
    }

    /// This cell's value: the cached formula result if present, the
    /// constant for Empty/Text cells, or a freshly computed (and cached)
    /// formula result.
    pub fn value(&self, lookup: &dyn CellLookup) -> Value {
        match &self.contents {
            Contents::Empty => Value::Number(0.0),
            Contents::Text(s) => Value::Text(s.clone()),
            Contents::Formula(formula) => {
                if let Some(cached) = self.cached_value.borrow().as_ref() {
                    return cached.clone();
                }
                let computed = match formula.evaluate(lookup) {
                    Ok(n) => Value::Number(n),
                    Err(e) => Value::Error(e),
                };
                *self.cached_value.borrow_mut() = Some(computed.clone());
                computed
            }
        }
    }
}

fn dedup_preserving_order(refs: &[Position]) -> Vec<Position> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(refs.len());
    for &p in refs {
        if seen.insert(p) {
            out.push(p);
        }
    }
    out
}
