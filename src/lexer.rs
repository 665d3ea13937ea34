use crate::error::Error;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Numeric literal as written in a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Decimal(Decimal),
}

/// Character-level scanner over path text.
///
/// Path grammar is context sensitive (a `.` separates segments but also
/// starts a decimal, `/` separates segments but also opens a regex), so the
/// parser pulls characters on demand instead of consuming a token stream.
#[derive(Clone)]
pub struct Lexer<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    pub fn advance_by(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    pub fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, expected: u8) -> Result<(), Error> {
        if self.eat(expected) {
            return Ok(());
        }
        match self.peek() {
            Some(found) => Err(self.error(format!(
                "Expected '{}' but found '{}'",
                expected as char, found as char
            ))),
            None => Err(self.error(format!("Expected '{}' but reached end of path", expected as char))),
        }
    }

    pub fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    pub fn error<M: Into<String>>(&self, message: M) -> Error {
        Error::syntax(message, self.pos)
    }

    /// Consume `word` if it appears next as a whole word, ignoring ASCII case.
    pub fn eat_keyword(&mut self, word: &str) -> bool {
        let end = self.pos + word.len();
        if end > self.input.len() || !self.input[self.pos..end].eq_ignore_ascii_case(word.as_bytes()) {
            return false;
        }
        if self.input.get(end).is_some_and(|&b| is_ident_byte(b)) {
            return false;
        }
        self.pos = end;
        true
    }

    /// Read an identifier; `\` makes the following character literal.
    pub fn read_name(&mut self) -> Result<String, Error> {
        let start = self.pos;
        let mut name = String::new();
        while let Some(b) = self.peek() {
            if b == b'\\' {
                self.pos += 1;
                match self.next_char() {
                    Some(c) => name.push(c),
                    None => return Err(self.error("Dangling escape at end of path")),
                }
            } else if is_ident_byte(b) {
                if let Some(c) = self.next_char() {
                    name.push(c);
                }
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(b) => self.error(format!("Unexpected '{}'", b as char)),
                None => self.error("Expected a name but reached end of path"),
            });
        }
        Ok(name)
    }

    /// Read a single- or double-quoted string literal.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let start = self.pos;
        let quote = match self.bump() {
            Some(q @ (b'\'' | b'"')) => q,
            _ => return Err(Error::syntax("Expected a quoted string", start)),
        };
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(Error::syntax("Unterminated string", start)),
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let c = self
                        .next_char()
                        .ok_or_else(|| Error::syntax("Unterminated string", start))?;
                    match c {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        'b' => out.push('\u{0008}'),
                        'f' => out.push('\u{000C}'),
                        'u' => out.push(self.read_unicode_escape()?),
                        other => out.push(other),
                    }
                }
                Some(_) => {
                    if let Some(c) = self.next_char() {
                        out.push(c);
                    }
                }
            }
        }
    }

    fn read_unicode_escape(&mut self) -> Result<char, Error> {
        let start = self.pos;
        let end = start + 4;
        let hex = self
            .text
            .get(start..end)
            .ok_or_else(|| Error::syntax("Truncated unicode escape", start))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| Error::syntax("Invalid unicode escape", start))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| Error::syntax("Invalid unicode escape", start))
    }

    /// Read an optionally signed number; a `.` followed by digits makes it a decimal.
    pub fn read_number(&mut self) -> Result<Number, Error> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let mut is_decimal = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_decimal = true;
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let mut scientific = false;
        if matches!(self.peek(), Some(b'e' | b'E'))
            && (matches!(self.peek_at(1), Some(b'0'..=b'9'))
                || (matches!(self.peek_at(1), Some(b'-' | b'+')) && matches!(self.peek_at(2), Some(b'0'..=b'9'))))
        {
            scientific = true;
            self.pos += 2;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if self.pos == digits_start {
            return Err(Error::syntax("Expected a number", start));
        }

        let literal = &self.text[start..self.pos];
        let literal = literal.strip_prefix('+').unwrap_or(literal);
        if scientific {
            return Decimal::from_scientific(literal)
                .map(Number::Decimal)
                .map_err(|_| Error::syntax(format!("Invalid number '{}'", literal), start));
        }
        if !is_decimal {
            if let Ok(i) = literal.parse::<i64>() {
                return Ok(Number::Int(i));
            }
        }
        Decimal::from_str(literal)
            .map(Number::Decimal)
            .map_err(|_| Error::syntax(format!("Invalid number '{}'", literal), start))
    }

    /// Read `/regex/` with an optional trailing `i`. Returns the source and
    /// the case-insensitive flag.
    pub fn read_regex(&mut self) -> Result<(String, bool), Error> {
        let start = self.pos;
        self.expect(b'/')?;
        let mut source = String::new();
        loop {
            match self.peek() {
                None => return Err(Error::syntax("Unterminated regex", start)),
                Some(b'/') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') if self.peek_at(1) == Some(b'/') => {
                    self.pos += 2;
                    source.push('/');
                }
                Some(b'\\') => {
                    self.pos += 1;
                    source.push('\\');
                    if let Some(c) = self.next_char() {
                        source.push(c);
                    }
                }
                Some(_) => {
                    if let Some(c) = self.next_char() {
                        source.push(c);
                    }
                }
            }
        }
        let case_insensitive = self.peek() == Some(b'i');
        if case_insensitive {
            self.pos += 1;
        }
        Ok((source, case_insensitive))
    }

    /// Raw text up to (not including) `close` at bracket depth zero.
    pub fn read_until(&mut self, close: u8) -> Result<&'a str, Error> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.peek() {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'[' | b'(' => depth += 1,
                    b']' | b')' if depth > 0 => depth -= 1,
                    _ if b == close && depth == 0 => return Ok(&self.text[start..self.pos]),
                    _ => {}
                },
            }
            self.pos += 1;
        }
        Err(Error::syntax(format!("Missing closing '{}'", close as char), start))
    }

    /// Raw text of a `$...` reference path, which ends at an unbalanced
    /// closing bracket, a logical operator, a comma or whitespace.
    pub fn read_reference(&mut self) -> &'a str {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.peek() {
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'\'' | b'"' => quote = Some(b),
                    b'[' | b'(' => depth += 1,
                    b']' | b')' if depth > 0 => depth -= 1,
                    b']' | b')' | b'&' | b'|' | b',' | b' ' | b'\t' | b'\n' | b'\r' if depth == 0 => break,
                    _ => {}
                },
            }
            self.pos += 1;
        }
        &self.text[start..self.pos]
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

/// Identifier bytes: ASCII alphanumerics, `_`, `$` and any non-ASCII byte.
pub fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}
