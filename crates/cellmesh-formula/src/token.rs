//! Hand-rolled tokenizer for the arithmetic formula language.
//!
//! No parser-combinator crate: the grammar is small enough that a manual
//! scanner stays simpler than pulling in one, matching how the corpus's own
//! formula-parser crates scan by hand rather than generating a lexer.

use crate::formula::FormulaParseError;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    /// A bare run of letters/digits: either a cell reference (`A1`) or,
    /// when immediately followed by `(`, a function name (`SUM`).
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Colon,
    Comma,
    End,
}

pub struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_number(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_byte() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek_byte(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek_byte(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                while matches!(self.peek_byte(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaParseError::Expected {
                expected: "number",
                found: text.to_string(),
            })
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_byte(), Some(b) if b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap();
        Token::Ident(text.to_string())
    }

    pub fn next(&mut self) -> Result<Token, FormulaParseError> {
        self.skip_whitespace();
        let Some(b) = self.peek_byte() else {
            return Ok(Token::End);
        };
        match b {
            b'+' => {
                self.pos += 1;
                Ok(Token::Plus)
            }
            b'-' => {
                self.pos += 1;
                Ok(Token::Minus)
            }
            b'*' => {
                self.pos += 1;
                Ok(Token::Star)
            }
            b'/' => {
                self.pos += 1;
                Ok(Token::Slash)
            }
            b'(' => {
                self.pos += 1;
                Ok(Token::LParen)
            }
            b')' => {
                self.pos += 1;
                Ok(Token::RParen)
            }
            b':' => {
                self.pos += 1;
                Ok(Token::Colon)
            }
            b',' => {
                self.pos += 1;
                Ok(Token::Comma)
            }
            b if b.is_ascii_digit() => self.read_number(),
            b if b.is_ascii_alphabetic() => Ok(self.read_ident()),
            other => Err(FormulaParseError::UnexpectedChar(other as char)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(input: &str) -> Vec<Token> {
        let mut tok = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let t = tok.next().unwrap();
            if t == Token::End {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn tokenizes_arithmetic() {
        assert_eq!(
            collect("A1+B2*3"),
            vec![
                Token::Ident("A1".into()),
                Token::Plus,
                Token::Ident("B2".into()),
                Token::Star,
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn tokenizes_range_call() {
        assert_eq!(
            collect("SUM(A1:B3)"),
            vec![
                Token::Ident("SUM".into()),
                Token::LParen,
                Token::Ident("A1".into()),
                Token::Colon,
                Token::Ident("B3".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn tokenizes_negative_and_decimal_numbers() {
        assert_eq!(collect("3.5"), vec![Token::Number(3.5)]);
        assert_eq!(collect("-2"), vec![Token::Minus, Token::Number(2.0)]);
    }
}
