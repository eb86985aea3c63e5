//! Recursive-descent parser over [`crate::token::Tokenizer`], producing an
//! [`ArithmeticFormula`].
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/') factor)*
//! factor  := ('-' | '+') factor | primary
//! primary := number | cell_ref | func '(' cell_ref ':' cell_ref ')' | '(' expr ')'
//! ```

use crate::ast::{ArithmeticFormula, Expr, Func, Op};
use crate::formula::FormulaParseError;
use crate::position::Position;
use crate::token::{Token, Tokenizer};

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Result<Self, FormulaParseError> {
        let mut tokenizer = Tokenizer::new(input);
        let current = tokenizer.next()?;
        Ok(Parser { tokenizer, current })
    }

    fn advance(&mut self) -> Result<(), FormulaParseError> {
        self.current = self.tokenizer.next()?;
        Ok(())
    }

    fn expect(&mut self, tok: &Token, expected: &'static str) -> Result<(), FormulaParseError> {
        if &self.current == tok {
            self.advance()
        } else {
            Err(FormulaParseError::Expected {
                expected,
                found: format!("{:?}", self.current),
            })
        }
    }

    fn expect_ident(&mut self, expected: &'static str) -> Result<String, FormulaParseError> {
        match self.current.clone() {
            Token::Ident(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(FormulaParseError::Expected {
                expected,
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, FormulaParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.current {
                Token::Plus => Op::Add,
                Token::Minus => Op::Sub,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, FormulaParseError> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.current {
                Token::Star => Op::Mul,
                Token::Slash => Op::Div,
                _ => break,
            };
            self.advance()?;
            let rhs = self.parse_factor()?;
            lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, FormulaParseError> {
        match self.current {
            Token::Minus => {
                self.advance()?;
                Ok(Expr::Neg(Box::new(self.parse_factor()?)))
            }
            Token::Plus => {
                self.advance()?;
                self.parse_factor()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, FormulaParseError> {
        match self.current.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::LParen => {
                self.advance()?;
                let e = self.parse_expr()?;
                self.expect(&Token::RParen, ")")?;
                Ok(e)
            }
            Token::Ident(name) => {
                self.advance()?;
                if self.current == Token::LParen {
                    self.parse_call(&name)
                } else {
                    Ok(Expr::Ref(parse_ref(&name)?))
                }
            }
            other => Err(FormulaParseError::Expected {
                expected: "expression",
                found: format!("{other:?}"),
            }),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, FormulaParseError> {
        let func = Func::from_name(name)
            .ok_or_else(|| FormulaParseError::UnknownFunction(name.to_string()))?;
        self.expect(&Token::LParen, "(")?;
        let start_name = self.expect_ident("cell reference")?;
        let start = parse_ref(&start_name)?;
        self.expect(&Token::Colon, ":")?;
        let end_name = self.expect_ident("cell reference")?;
        let end = parse_ref(&end_name)?;
        self.expect(&Token::RParen, ")")?;
        Ok(Expr::Call(func, start, end))
    }
}

fn parse_ref(name: &str) -> Result<Position, FormulaParseError> {
    let pos = Position::from_a1(name);
    if pos.is_valid() {
        Ok(pos)
    } else {
        Err(FormulaParseError::InvalidReference(name.to_string()))
    }
}

/// Parse a full formula (no leading `=`) into its canonical AST form.
pub fn parse_expression(text: &str) -> Result<ArithmeticFormula, FormulaParseError> {
    if text.trim().is_empty() {
        return Err(FormulaParseError::UnexpectedEnd);
    }
    let mut parser = Parser::new(text)?;
    let expr = parser.parse_expr()?;
    if parser.current != Token::End {
        return Err(FormulaParseError::TrailingInput(format!(
            "{:?}",
            parser.current
        )));
    }
    Ok(ArithmeticFormula::new(expr))
}
