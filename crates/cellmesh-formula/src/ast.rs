//! Arithmetic formula AST: numeric literals, cell references, the four
//! infix operators, unary minus, parentheses, and aggregate functions over
//! rectangular ranges.

use std::fmt;

use crate::formula::{CellLookup, Formula};
use crate::position::Position;
use crate::value::FormulaError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// Binding power: `*`/`/` bind tighter than `+`/`-`.
    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Func {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        match name {
            "SUM" => Some(Func::Sum),
            "AVERAGE" => Some(Func::Average),
            "MIN" => Some(Func::Min),
            "MAX" => Some(Func::Max),
            "COUNT" => Some(Func::Count),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Sum => "SUM",
            Func::Average => "AVERAGE",
            Func::Min => "MIN",
            Func::Max => "MAX",
            Func::Count => "COUNT",
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Number(f64),
    Ref(Position),
    Neg(Box<Expr>),
    BinOp(Op, Box<Expr>, Box<Expr>),
    /// A rectangular range, valid only as the sole argument of a call.
    Call(Func, Position, Position),
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Expr::BinOp(op, ..) => op.precedence(),
            Expr::Neg(_) => 3,
            _ => u8::MAX,
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, parent_precedence: u8) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Ref(p) => write!(f, "{p}"),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.write(f, 3)
            }
            Expr::BinOp(op, lhs, rhs) => {
                let prec = op.precedence();
                let needs_parens = prec < parent_precedence;
                if needs_parens {
                    write!(f, "(")?;
                }
                lhs.write(f, prec)?;
                write!(f, "{}", op.symbol())?;
                // The right side of a left-associative operator needs
                // parens if it is of equal precedence (e.g. 1-(2-3)).
                rhs.write(f, prec + 1)?;
                if needs_parens {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expr::Call(func, start, end) => {
                write!(f, "{}({}:{})", func.name(), start, end)
            }
        }
    }

    fn collect_references(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Ref(p) => out.push(*p),
            Expr::Neg(inner) => inner.collect_references(out),
            Expr::BinOp(_, lhs, rhs) => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
            Expr::Call(_, start, end) => {
                for_each_in_range(*start, *end, |p| out.push(p));
            }
        }
    }

    fn eval(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Ref(p) => {
                if !p.is_valid() {
                    return Err(FormulaError::Ref);
                }
                lookup.value(*p).as_number()
            }
            Expr::Neg(inner) => Ok(-inner.eval(lookup)?),
            Expr::BinOp(op, lhs, rhs) => {
                let a = lhs.eval(lookup)?;
                let b = rhs.eval(lookup)?;
                let result = match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => {
                        if b == 0.0 {
                            return Err(FormulaError::Arithmetic);
                        }
                        a / b
                    }
                };
                if !result.is_finite() {
                    return Err(FormulaError::Arithmetic);
                }
                Ok(result)
            }
            Expr::Call(func, start, end) => eval_aggregate(*func, *start, *end, lookup),
        }
    }
}

fn for_each_in_range(start: Position, end: Position, mut f: impl FnMut(Position)) {
    let (r0, r1) = (start.row.min(end.row), start.row.max(end.row));
    let (c0, c1) = (start.col.min(end.col), start.col.max(end.col));
    for row in r0..=r1 {
        for col in c0..=c1 {
            f(Position::new(row, col));
        }
    }
}

fn eval_aggregate(
    func: Func,
    start: Position,
    end: Position,
    lookup: &dyn CellLookup,
) -> Result<f64, FormulaError> {
    // Aggregate functions skip non-numeric cells (text, errors) rather than
    // propagating the first error, matching the common spreadsheet
    // convention of tolerant range aggregation.
    let mut sum = 0.0;
    let mut count = 0u64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for_each_in_range(start, end, |pos| {
        if let Ok(n) = lookup.value(pos).as_number() {
            sum += n;
            count += 1;
            if n < min {
                min = n;
            }
            if n > max {
                max = n;
            }
        }
    });

    match func {
        Func::Sum => Ok(sum),
        Func::Count => Ok(count as f64),
        Func::Average if count > 0 => Ok(sum / count as f64),
        Func::Min if count > 0 => Ok(min),
        Func::Max if count > 0 => Ok(max),
        Func::Average | Func::Min | Func::Max => Err(FormulaError::Arithmetic),
    }
}

/// The concrete `Formula` implementation: a parsed arithmetic expression
/// with its referenced positions precomputed in traversal order.
#[derive(Clone, Debug)]
pub struct ArithmeticFormula {
    pub(crate) root: Expr,
    references: Vec<Position>,
}

impl ArithmeticFormula {
    pub fn new(root: Expr) -> ArithmeticFormula {
        let mut references = Vec::new();
        root.collect_references(&mut references);
        ArithmeticFormula { root, references }
    }
}

impl Formula for ArithmeticFormula {
    fn evaluate(&self, lookup: &dyn CellLookup) -> Result<f64, FormulaError> {
        self.root.eval(lookup)
    }

    fn canonical_text(&self) -> String {
        struct Printer<'a>(&'a Expr);
        impl fmt::Display for Printer<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.write(f, 0)
            }
        }
        Printer(&self.root).to_string()
    }

    fn references(&self) -> &[Position] {
        &self.references
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLookup(HashMap<Position, crate::value::Value>);
    impl CellLookup for MapLookup {
        fn value(&self, pos: Position) -> crate::value::Value {
            self.0
                .get(&pos)
                .cloned()
                .unwrap_or(crate::value::Value::Number(0.0))
        }
    }

    #[test]
    fn canonical_text_parenthesizes_only_when_needed() {
        let a = Position::new(0, 0);
        let b = Position::new(0, 1);
        let f = ArithmeticFormula::new(Expr::BinOp(
            Op::Mul,
            Box::new(Expr::BinOp(Op::Add, Box::new(Expr::Ref(a)), Box::new(Expr::Ref(b)))),
            Box::new(Expr::Number(2.0)),
        ));
        assert_eq!(f.canonical_text(), "(A1+B1)*2");
    }

    #[test]
    fn sum_ignores_text_cells() {
        let mut values = HashMap::new();
        values.insert(Position::new(0, 0), crate::value::Value::Number(1.0));
        values.insert(Position::new(1, 0), crate::value::Value::Text("x".into()));
        let lookup = MapLookup(values);
        let f = ArithmeticFormula::new(Expr::Call(Func::Sum, Position::new(0, 0), Position::new(1, 0)));
        assert_eq!(f.evaluate(&lookup), Ok(1.0));
    }
}
