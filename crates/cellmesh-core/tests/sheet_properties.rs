//! Integration tests for the sheet's core invariants and the concrete
//! scenarios the engine must get right: cross-cell evaluation, cycle
//! rejection, cache invalidation, text escaping, and printable-size
//! tracking.

use cellmesh_core::{FormulaError, Position, Sheet, SheetError, Value};

fn pos(s: &str) -> Position {
    use std::str::FromStr;
    Position::from_str(s).unwrap()
}

#[test]
fn test_formula_reads_another_cell() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "=B1").unwrap();
    sheet.set(pos("B1"), "42").unwrap();

    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.value(), Value::Number(42.0));
    assert_eq!(a1.references(), &[pos("B1")]);

    let b1 = sheet.get(pos("B1")).unwrap().unwrap();
    assert!(b1.is_referenced());
}

#[test]
fn test_self_reference_is_rejected() {
    let mut sheet = Sheet::new();
    let err = sheet.set(pos("A1"), "=A1").unwrap_err();
    assert!(matches!(err, SheetError::CircularDependency(p) if p == pos("A1")));
    assert!(sheet.get(pos("A1")).unwrap().is_none());
}

#[test]
fn test_indirect_cycle_is_rejected_and_placeholder_remains() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "=B1").unwrap();
    let err = sheet.set(pos("B1"), "=A1").unwrap_err();
    assert!(matches!(err, SheetError::CircularDependency(p) if p == pos("B1")));

    // B1 still exists as the empty placeholder A1's formula created.
    let b1 = sheet.get(pos("B1")).unwrap().unwrap();
    assert_eq!(b1.value(), Value::Number(0.0));
    assert_eq!(b1.text(), "");

    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.value(), Value::Number(0.0));
}

#[test]
fn test_division_by_zero_is_arithmetic_error() {
    let mut sheet = Sheet::new();
    sheet.set(pos("B1"), "0").unwrap();
    sheet.set(pos("A1"), "=B1/0").unwrap();
    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.value(), Value::Error(FormulaError::Arithmetic));
}

#[test]
fn test_apostrophe_escapes_formula_looking_text() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "hello").unwrap();
    sheet.set(pos("A1"), "'=x").unwrap();
    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.text(), "'=x");
    assert_eq!(a1.value(), Value::Text("=x".into()));
}

#[test]
fn test_printable_size_tracks_non_empty_cells() {
    let mut sheet = Sheet::new();
    sheet.set(pos("C3"), "x").unwrap();
    assert_eq!(sheet.printable_size(), cellmesh_core::Size::new(3, 3));
    sheet.clear(pos("C3")).unwrap();
    assert_eq!(sheet.printable_size(), cellmesh_core::Size::new(0, 0));
}

#[test]
fn test_cleared_but_referenced_cell_persists_as_empty() {
    let mut sheet = Sheet::new();
    sheet.set(pos("C3"), "x").unwrap();
    sheet.set(pos("A1"), "=C3").unwrap();
    sheet.clear(pos("C3")).unwrap();

    let c3 = sheet.get(pos("C3")).unwrap().unwrap();
    assert_eq!(c3.text(), "");
    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.value(), Value::Number(0.0));
}

#[test]
fn test_clear_destroys_an_unreferenced_cell() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "x").unwrap();
    sheet.clear(pos("A1")).unwrap();
    assert!(sheet.get(pos("A1")).unwrap().is_none());
}

#[test]
fn test_invalid_position_is_rejected() {
    let mut sheet = Sheet::new();
    let huge = Position::new(16384, 0);
    assert!(matches!(
        sheet.set(huge, "1").unwrap_err(),
        SheetError::InvalidPosition(p) if p == huge
    ));
    assert!(matches!(
        sheet.get(huge).unwrap_err(),
        SheetError::InvalidPosition(p) if p == huge
    ));
    assert!(matches!(
        sheet.clear(huge).unwrap_err(),
        SheetError::InvalidPosition(p) if p == huge
    ));
}

#[test]
fn test_reverse_edges_mirror_forward_edges() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "=SUM(B1:B3)").unwrap();
    sheet.set(pos("B2"), "7").unwrap();

    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    for q in a1.references() {
        let handle = sheet.get(*q).unwrap();
        assert!(handle.is_some(), "referenced cell {q} must exist");
        assert!(handle.unwrap().is_referenced());
    }
}

#[test]
fn test_text_roundtrips_except_formula_canonicalization() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "hello world").unwrap();
    assert_eq!(sheet.get(pos("A1")).unwrap().unwrap().text(), "hello world");

    sheet.set(pos("B1"), "5").unwrap();
    // Whitespace in the input is insignificant; the stored form is the
    // canonical, whitespace-free re-emission.
    sheet.set(pos("A2"), "=  B1 + 1").unwrap();
    assert_eq!(sheet.get(pos("A2")).unwrap().unwrap().text(), "=B1+1");
}

#[test]
fn test_repeated_value_reads_are_stable() {
    let mut sheet = Sheet::new();
    sheet.set(pos("B1"), "10").unwrap();
    sheet.set(pos("A1"), "=B1*2").unwrap();
    let a1 = sheet.get(pos("A1")).unwrap().unwrap();
    assert_eq!(a1.value(), a1.value());
}

#[test]
fn test_writing_a_transitive_dependency_invalidates_the_cache() {
    let mut sheet = Sheet::new();
    sheet.set(pos("C1"), "1").unwrap();
    sheet.set(pos("B1"), "=C1+1").unwrap();
    sheet.set(pos("A1"), "=B1+1").unwrap();

    assert_eq!(
        sheet.get(pos("A1")).unwrap().unwrap().value(),
        Value::Number(3.0)
    );

    sheet.set(pos("C1"), "10").unwrap();
    assert_eq!(
        sheet.get(pos("A1")).unwrap().unwrap().value(),
        Value::Number(12.0)
    );
}

#[test]
fn test_set_is_a_no_op_when_text_is_unchanged() {
    let mut sheet = Sheet::new();
    sheet.set(pos("B1"), "5").unwrap();
    sheet.set(pos("A1"), "=B1").unwrap();
    assert_eq!(
        sheet.get(pos("A1")).unwrap().unwrap().value(),
        Value::Number(5.0)
    );

    // Re-setting B1 to the exact same text must not invalidate A1's cache
    // via a spurious write, and must remain idempotent.
    sheet.set(pos("B1"), "5").unwrap();
    assert_eq!(
        sheet.get(pos("A1")).unwrap().unwrap().value(),
        Value::Number(5.0)
    );
}

#[test]
fn test_aggregate_over_a_range() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "1").unwrap();
    sheet.set(pos("A2"), "2").unwrap();
    sheet.set(pos("A3"), "3").unwrap();
    sheet.set(pos("B1"), "=SUM(A1:A3)").unwrap();
    assert_eq!(
        sheet.get(pos("B1")).unwrap().unwrap().value(),
        Value::Number(6.0)
    );
}

#[test]
fn test_print_values_and_texts() {
    let mut sheet = Sheet::new();
    sheet.set(pos("A1"), "1").unwrap();
    sheet.set(pos("B1"), "=A1+1").unwrap();

    let mut values = Vec::new();
    sheet.print_values(&mut values).unwrap();
    assert_eq!(String::from_utf8(values).unwrap(), "1\t2\n");

    let mut texts = Vec::new();
    sheet.print_texts(&mut texts).unwrap();
    assert_eq!(String::from_utf8(texts).unwrap(), "1\t=A1+1\n");
}
