//! Syntax checking for boolean filter expressions, such as those selecting the
//! service instances in a resolver subset:
//!
//! ```text
//! Service.Meta.version == v1 and "canary" not in Service.Tags
//! ```
//!
//! Only the grammar is checked; selectors are not resolved against a schema.

use std::{iter::Peekable, str::CharIndices};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct FilterError {
    pub message: String,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Equal,
    NotEqual,
    Ident(String),
    Number,
    Str,
}

/// Checks that `expr` is a well-formed filter expression.
pub fn parse(expr: &str) -> Result<(), FilterError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: expr.len(),
    };
    parser.or()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(()),
        Some((offset, Token::RParen)) => Err(parser.error(*offset, "unmatched parentheses")),
        Some((offset, _)) => Err(parser.error(*offset, "unexpected input")),
    }
}

fn tokenize(expr: &str) -> Result<Vec<(usize, Token)>, FilterError> {
    fn error(offset: usize, message: &str) -> FilterError {
        FilterError {
            message: message.to_string(),
            offset,
        }
    }

    fn take_while(
        chars: &mut Peekable<CharIndices<'_>>,
        buf: &mut String,
        f: impl Fn(char) -> bool,
    ) {
        while let Some((_, c)) = chars.peek().copied() {
            if !f(c) {
                break;
            }
            buf.push(c);
            chars.next();
        }
    }

    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        let token = match c {
            ' ' | '\t' | '\r' | '\n' => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '.' => Token::Dot,
            '=' | '!' => match chars.next() {
                Some((_, '=')) if c == '=' => Token::Equal,
                Some((_, '=')) => Token::NotEqual,
                _ => return Err(error(offset, "invalid operator")),
            },
            '"' | '`' => {
                let mut closed = false;
                while let Some((_, next)) = chars.next() {
                    if next == '\\' && c == '"' {
                        chars.next();
                    } else if next == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(error(offset, "unterminated string literal"));
                }
                Token::Str
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut buf = c.to_string();
                take_while(&mut chars, &mut buf, |c| c.is_ascii_digit() || c == '.');
                if buf == "-" || buf.ends_with('.') || buf.matches('.').count() > 1 {
                    return Err(error(offset, "invalid number literal"));
                }
                Token::Number
            }
            c if c.is_ascii_alphabetic() => {
                let mut buf = c.to_string();
                take_while(&mut chars, &mut buf, |c| {
                    c.is_ascii_alphanumeric() || c == '_' || c == '/' || c == '-'
                });
                Token::Ident(buf)
            }
            _ => return Err(error(offset, "unexpected character")),
        };
        tokens.push((offset, token));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn error(&self, offset: usize, message: &str) -> FilterError {
        FilterError {
            message: message.to_string(),
            offset,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(self.end)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(id)) if id == keyword)
    }

    fn peek_keywords(&self, keywords: &[&str]) -> bool {
        keywords.iter().enumerate().all(|(i, kw)| {
            matches!(self.tokens.get(self.pos + i), Some((_, Token::Ident(id))) if id == kw)
        })
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, token: Token, message: &str) -> Result<(), FilterError> {
        if self.peek() == Some(&token) {
            self.bump();
            return Ok(());
        }
        Err(self.error(self.offset(), message))
    }

    fn or(&mut self) -> Result<(), FilterError> {
        self.and()?;
        while self.peek_keyword("or") {
            self.bump();
            self.and()?;
        }
        Ok(())
    }

    fn and(&mut self) -> Result<(), FilterError> {
        self.not()?;
        while self.peek_keyword("and") {
            self.bump();
            self.not()?;
        }
        Ok(())
    }

    fn not(&mut self) -> Result<(), FilterError> {
        if self.peek_keyword("not") {
            self.bump();
            return self.not();
        }
        if self.peek() == Some(&Token::LParen) {
            self.bump();
            self.or()?;
            return self.expect(Token::RParen, "unmatched parentheses");
        }
        self.matcher()
    }

    fn matcher(&mut self) -> Result<(), FilterError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                self.selector()?;
                self.selector_operation()
            }
            Some(Token::Number | Token::Str) => {
                self.bump();
                self.membership()
            }
            _ => Err(self.error(self.offset(), "expected a match expression")),
        }
    }

    /// Parses whatever follows a selector on the left of an operator.
    fn selector_operation(&mut self) -> Result<(), FilterError> {
        match self.peek() {
            Some(Token::Equal | Token::NotEqual) => {
                self.bump();
                return self.value();
            }
            _ => {}
        }

        if self.peek_keywords(&["is", "empty"]) {
            self.pos += 2;
            return Ok(());
        }
        if self.peek_keywords(&["is", "not", "empty"]) {
            self.pos += 3;
            return Ok(());
        }

        for op in ["contains", "matches"] {
            if self.peek_keyword(op) {
                self.bump();
                return self.value();
            }
            if self.peek_keywords(&["not", op]) {
                self.pos += 2;
                return self.value();
            }
        }

        // A bare selector may also be the value on the left of a membership test.
        self.membership()
    }

    fn membership(&mut self) -> Result<(), FilterError> {
        if self.peek_keyword("in") {
            self.bump();
        } else if self.peek_keywords(&["not", "in"]) {
            self.pos += 2;
        } else {
            return Err(self.error(self.offset(), "expected a match operator"));
        }
        match self.peek() {
            Some(Token::Ident(_)) => self.selector(),
            _ => Err(self.error(self.offset(), "invalid selector")),
        }
    }

    fn value(&mut self) -> Result<(), FilterError> {
        match self.peek() {
            Some(Token::Number | Token::Str) => {
                self.bump();
                Ok(())
            }
            Some(Token::Ident(_)) => self.selector(),
            _ => Err(self.error(self.offset(), "expected a value")),
        }
    }

    fn selector(&mut self) -> Result<(), FilterError> {
        match self.peek() {
            Some(Token::Ident(id)) if id.starts_with(|c: char| c.is_ascii_alphabetic()) => {
                self.bump()
            }
            _ => return Err(self.error(self.offset(), "invalid selector")),
        }

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.bump();
                    match self.peek() {
                        Some(Token::Ident(_) | Token::Number) => self.bump(),
                        _ => return Err(self.error(self.offset(), "invalid selector")),
                    }
                }
                Some(Token::LBracket) => {
                    self.bump();
                    self.expect(Token::Str, "index must be a string literal")?;
                    self.expect(Token::RBracket, "unclosed index expression")?;
                }
                _ => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse;
    use rstest::rstest;

    #[rstest]
    #[case("Service.Meta.version == v1")]
    #[case("Service.Meta.version == \"v1\"")]
    #[case("Service.Meta[\"version\"] != `v1`")]
    #[case("ServiceMeta.version == v1 and Service.Tags is not empty")]
    #[case("not (Checks.Status == passing or Node.Meta.env == prod)")]
    #[case("\"canary\" in Service.Tags")]
    #[case("canary not in Service.Tags")]
    #[case("Service.Port == 8080")]
    #[case("Service.Tags contains primary")]
    #[case("Node.Node matches `web-.*`")]
    #[case("Service.Tags is empty")]
    fn accepts(#[case] expr: &str) {
        assert_eq!(parse(expr), Ok(()), "{expr}");
    }

    #[rstest]
    #[case("random string")]
    #[case("Service.Meta.version ==")]
    #[case("(Service.Meta.version == v1")]
    #[case("Service.Meta.version == v1)")]
    #[case("Service.Meta.version = v1")]
    #[case("Service.Meta[version] == v1")]
    #[case("\"unterminated == v1")]
    #[case("v1 in \"tags\"")]
    #[case("")]
    fn rejects(#[case] expr: &str) {
        assert!(parse(expr).is_err(), "{expr}");
    }
}
