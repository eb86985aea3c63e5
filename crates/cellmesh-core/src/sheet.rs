//! Grid storage, cell lifecycle, cycle checking, cache invalidation, and
//! printable-size tracking.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{self, Write};

use cellmesh_formula::{CellLookup, Position, Size, Value};

use crate::cell::Cell;
use crate::error::{Result, SheetError};

/// An in-memory spreadsheet: a jagged grid of cells plus the reverse
/// dependency edges needed to invalidate caches on write.
///
/// `Sheet` is the only public surface clients mutate or query through; it
/// owns every cell exclusively. Reverse edges are held as a
/// position-keyed map rather than as back-pointers into cell storage, so
/// there is no handover needed when a cell is replaced (see `set`).
pub struct Sheet {
    rows: Vec<Vec<Option<Cell>>>,
    /// `reverse_refs[p]` is the set of positions whose formula reads `p`.
    reverse_refs: BTreeMap<Position, BTreeSet<Position>>,
    printable: Size,
}

/// A read-only view onto a cell, borrowing the sheet it lives in so that
/// [`CellHandle::value`] can lazily evaluate and cache a formula result.
pub struct CellHandle<'a> {
    pos: Position,
    cell: &'a Cell,
    sheet: &'a Sheet,
}

impl<'a> CellHandle<'a> {
    pub fn value(&self) -> Value {
        self.cell.value(self.sheet)
    }

    pub fn text(&self) -> &str {
        self.cell.text()
    }

    pub fn references(&self) -> &[Position] {
        self.cell.references()
    }

    pub fn is_referenced(&self) -> bool {
        self.sheet.is_referenced(self.pos)
    }
}

impl Sheet {
    pub fn new() -> Sheet {
        Sheet {
            rows: Vec::new(),
            reverse_refs: BTreeMap::new(),
            printable: Size::default(),
        }
    }

    /// Write `text` to `pos`, replacing whatever was there.
    ///
    /// Fails with [`SheetError::InvalidPosition`] for an out-of-range
    /// position, [`SheetError::FormulaParse`] if `text` is an unparseable
    /// formula (the cell at `pos` is left untouched), or
    /// [`SheetError::CircularDependency`] if accepting the edit would close
    /// a reference cycle (the previous cell at `pos`, if any, is restored).
    pub fn set(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        self.ensure_capacity(pos);

        if let Some(existing) = self.cell_at(pos) {
            if existing.text() == text {
                return Ok(());
            }
        }

        // Parse before touching storage: on a parse error the cell at
        // `pos` must be left exactly as it was.
        let new_cell = Cell::from_input(text)?;
        let new_refs = new_cell.references().to_vec();

        let previous = self.take_cell(pos);
        let previous_refs: Vec<Position> = previous
            .as_ref()
            .map(|c| c.references().to_vec())
            .unwrap_or_default();

        let mut visited = HashSet::new();
        self.invalidate_dependents_cache(pos, &mut visited);

        self.sever_forward_edges(pos, &previous_refs);
        for &target in &new_refs {
            self.ensure_cell_exists(target);
            self.reverse_refs.entry(target).or_default().insert(pos);
        }

        self.put_cell(pos, new_cell);

        for &target in &new_refs {
            if self.has_cycle_from(target) {
                self.sever_forward_edges(pos, &new_refs);
                match previous {
                    Some(prev) => self.put_cell(pos, prev),
                    None => self.clear_cell_slot(pos),
                }
                for target in &previous_refs {
                    self.reverse_refs.entry(*target).or_default().insert(pos);
                }
                self.recompute_printable_size();
                return Err(SheetError::CircularDependency(pos));
            }
        }

        self.recompute_printable_size();
        Ok(())
    }

    /// Read-only access to the cell at `pos`, or `None` if nothing has ever
    /// been written there.
    pub fn get(&self, pos: Position) -> Result<Option<CellHandle<'_>>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self
            .cell_at(pos)
            .map(|cell| CellHandle { pos, cell, sheet: self }))
    }

    /// Clear `pos`. If the cell is still referenced by another formula it
    /// is replaced with an empty cell (so dependents keep a valid target
    /// that evaluates to zero); otherwise it is destroyed outright.
    pub fn clear(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        if !self.in_bounds(pos) {
            return Ok(());
        }
        let Some(cell) = self.cell_at(pos) else {
            return Ok(());
        };
        let forward_refs = cell.references().to_vec();
        let referenced = self.is_referenced(pos);

        let mut visited = HashSet::new();
        self.invalidate_dependents_cache(pos, &mut visited);

        self.sever_forward_edges(pos, &forward_refs);

        if referenced {
            self.put_cell(pos, Cell::empty());
        } else {
            self.clear_cell_slot(pos);
            self.reverse_refs.remove(&pos);
        }

        self.recompute_printable_size();
        Ok(())
    }

    pub fn printable_size(&self) -> Size {
        self.printable
    }

    /// Write each cell's evaluated value, tab-separated within a row,
    /// newline-separated between rows, over the printable bounding box.
    pub fn print_values(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_cells(out, |cell, sheet| cell.value(sheet).to_string())
    }

    /// Same as [`Sheet::print_values`] but emitting each cell's raw text.
    pub fn print_texts(&self, out: &mut impl Write) -> io::Result<()> {
        self.print_cells(out, |cell, _sheet| cell.text().to_string())
    }

    fn print_cells(
        &self,
        out: &mut impl Write,
        render: impl Fn(&Cell, &Sheet) -> String,
    ) -> io::Result<()> {
        let size = self.printable;
        for row in 0..size.rows {
            if row > 0 {
                writeln!(out)?;
            }
            for col in 0..size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cell_at(Position::new(row, col)) {
                    write!(out, "{}", render(cell, self))?;
                }
            }
        }
        if size.rows > 0 {
            writeln!(out)?;
        }
        Ok(())
    }

    fn is_referenced(&self, pos: Position) -> bool {
        self.reverse_refs
            .get(&pos)
            .is_some_and(|deps| !deps.is_empty())
    }

    fn sever_forward_edges(&mut self, from: Position, targets: &[Position]) {
        for target in targets {
            if let Some(set) = self.reverse_refs.get_mut(target) {
                set.remove(&from);
            }
        }
    }

    /// Clear the cached value of every cell transitively reachable via
    /// reverse edges from `pos`. `visited` guards against revisiting a
    /// cell (and against a pathological transient cycle mid-edit).
    fn invalidate_dependents_cache(&self, pos: Position, visited: &mut HashSet<Position>) {
        let Some(dependents) = self.reverse_refs.get(&pos) else {
            return;
        };
        let dependents: Vec<Position> = dependents.iter().copied().collect();
        for dep in dependents {
            if visited.insert(dep) {
                if let Some(cell) = self.cell_at(dep) {
                    cell.invalidate_cache();
                }
                self.invalidate_dependents_cache(dep, visited);
            }
        }
    }

    /// Depth-first search over forward_refs starting at `start`, using a
    /// visited set and an on-stack set; a node revisited while still on
    /// the stack closes a cycle. Run once per direct forward reference of
    /// a freshly written cell, which suffices because any cycle through
    /// the new cell must pass through one of those outgoing edges.
    fn has_cycle_from(&self, start: Position) -> bool {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        self.dfs_cycle(start, &mut visited, &mut on_stack)
    }

    fn dfs_cycle(
        &self,
        current: Position,
        visited: &mut HashSet<Position>,
        on_stack: &mut HashSet<Position>,
    ) -> bool {
        if on_stack.contains(&current) {
            return true;
        }
        if !visited.insert(current) {
            return false;
        }
        on_stack.insert(current);
        let refs = self
            .cell_at(current)
            .map(|c| c.references().to_vec())
            .unwrap_or_default();
        for next in refs {
            if self.dfs_cycle(next, visited, on_stack) {
                return true;
            }
        }
        on_stack.remove(&current);
        false
    }

    fn recompute_printable_size(&mut self) {
        let mut rows = 0i64;
        let mut cols = 0i64;
        for (r, row) in self.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if let Some(cell) = cell {
                    if !cell.text().is_empty() {
                        rows = rows.max(r as i64 + 1);
                        cols = cols.max(c as i64 + 1);
                    }
                }
            }
        }
        self.printable = Size::new(rows, cols);
    }

    fn in_bounds(&self, pos: Position) -> bool {
        (pos.row as usize) < self.rows.len() && (pos.col as usize) < self.rows[pos.row as usize].len()
    }

    fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.rows.get(pos.row as usize)?.get(pos.col as usize)?.as_ref()
    }

    fn take_cell(&mut self, pos: Position) -> Option<Cell> {
        self.rows[pos.row as usize][pos.col as usize].take()
    }

    fn put_cell(&mut self, pos: Position, cell: Cell) {
        self.rows[pos.row as usize][pos.col as usize] = Some(cell);
    }

    fn clear_cell_slot(&mut self, pos: Position) {
        if self.in_bounds(pos) {
            self.rows[pos.row as usize][pos.col as usize] = None;
        }
    }

    fn ensure_cell_exists(&mut self, pos: Position) {
        self.ensure_capacity(pos);
        if self.cell_at(pos).is_none() {
            self.put_cell(pos, Cell::empty());
        }
    }

    /// Grow the backing store to include `pos`, padding every row to at
    /// least the current printable width so rows stay rectangular up to
    /// that point (shrinking the backing store is never required).
    fn ensure_capacity(&mut self, pos: Position) {
        let row_idx = pos.row as usize;
        let col_idx = pos.col as usize;
        if self.rows.len() <= row_idx {
            self.rows.resize_with(row_idx + 1, Vec::new);
        }
        let min_width = (col_idx + 1).max(self.printable.cols as usize);
        for row in &mut self.rows {
            if row.len() < min_width {
                row.resize_with(min_width, || None);
            }
        }
    }
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new()
    }
}

impl CellLookup for Sheet {
    fn value(&self, pos: Position) -> Value {
        match self.cell_at(pos) {
            Some(cell) => cell.value(self),
            None => Value::Number(0.0),
        }
    }
}
