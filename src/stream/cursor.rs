use crate::ast::fnv1a_64;
use crate::error::Error;
use crate::types::Value;
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    String,
    Number,
    True,
    False,
    Null,
    Comma,
    Colon,
    Eof,
    /// A byte that cannot start any JSON token.
    Invalid,
}

/// Where a field seek left the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekResult {
    NotMatch,
    Value,
    Object,
    Array,
}

/// Forward-only navigation over a token stream.
pub trait TokenCursor {
    fn kind(&self) -> TokenKind;

    /// Step over the current token.
    fn advance(&mut self) -> Result<(), Error>;

    /// With the cursor on an object, move to the value stored under `name`.
    /// `hash` is the FNV-1a hash of `name`. A non-deep miss consumes the
    /// object. With `deep`, the search covers every nested level of the
    /// current value, and calling again resumes after the previous match;
    /// `NotMatch` marks the end of that value.
    fn seek_to_field(&mut self, name: &str, hash: u64, deep: bool) -> Result<SeekResult, Error>;

    /// With the cursor on an array, move to element `index`. A miss
    /// consumes the array.
    fn seek_to_index(&mut self, index: usize) -> Result<bool, Error>;

    fn skip_value(&mut self) -> Result<(), Error>;

    /// Consume the rest of the innermost container the cursor is inside.
    fn exit_container(&mut self) -> Result<(), Error>;

    /// Materialize the current value.
    fn read_value(&mut self) -> Result<Value, Error>;
}

/// Cursor over JSON text. Only values handed to `read_value` are parsed.
pub struct JsonCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    deep_scope: Option<usize>,
}

impl<'a> JsonCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut cursor = Self {
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
            deep_scope: None,
        };
        cursor.skip_ws();
        cursor
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn skip_ws(&mut self) {
        while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> Error {
        Error::Json(format!("{} at byte {}", message, self.pos))
    }

    /// Index one past the closing quote of the string starting at `start`.
    fn string_end(&self, start: usize) -> Result<usize, Error> {
        let mut i = start + 1;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b'\\' => i += 2,
                b'"' => return Ok(i + 1),
                _ => i += 1,
            }
        }
        Err(self.error("unterminated string"))
    }

    fn scalar_end(&self, start: usize) -> usize {
        let mut i = start;
        while let Some(&b) = self.bytes.get(i) {
            if matches!(b, b',' | b':' | b']' | b'}' | b' ' | b'\t' | b'\r' | b'\n') {
                break;
            }
            i += 1;
        }
        i
    }

    /// Index one past the end of the value at the cursor.
    fn value_end(&self) -> Result<usize, Error> {
        match self.kind() {
            TokenKind::String => self.string_end(self.pos),
            TokenKind::BeginObject | TokenKind::BeginArray => {
                let mut nesting = 0usize;
                let mut i = self.pos;
                while let Some(&b) = self.bytes.get(i) {
                    match b {
                        b'"' => {
                            i = self.string_end(i)?;
                            continue;
                        }
                        b'{' | b'[' => nesting += 1,
                        b'}' | b']' => {
                            nesting -= 1;
                            if nesting == 0 {
                                return Ok(i + 1);
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                Err(self.error("unterminated container"))
            }
            TokenKind::Number | TokenKind::True | TokenKind::False | TokenKind::Null => {
                Ok(self.scalar_end(self.pos))
            }
            _ => Err(self.error("expected a value")),
        }
    }

    /// Decode the string token at the cursor and step past it.
    fn read_string(&mut self) -> Result<Cow<'a, str>, Error> {
        let bytes = self.bytes;
        let start = self.pos;
        let end = self.string_end(start)?;
        let raw = &bytes[start..end];
        let text = if raw.contains(&b'\\') {
            Cow::Owned(serde_json::from_slice::<String>(raw)?)
        } else {
            let inner = &bytes[start + 1..end - 1];
            Cow::Borrowed(std::str::from_utf8(inner).map_err(|_| self.error("invalid utf-8 in string"))?)
        };
        self.pos = end;
        self.skip_ws();
        Ok(text)
    }

    fn value_kind(&self) -> SeekResult {
        match self.kind() {
            TokenKind::BeginObject => SeekResult::Object,
            TokenKind::BeginArray => SeekResult::Array,
            _ => SeekResult::Value,
        }
    }

    fn eat_separator(&mut self, kind: TokenKind) -> Result<bool, Error> {
        if self.kind() == kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn seek_in_object(&mut self, name: &str, hash: u64) -> Result<SeekResult, Error> {
        if self.kind() != TokenKind::BeginObject {
            self.skip_value()?;
            return Ok(SeekResult::NotMatch);
        }
        self.advance()?;
        loop {
            match self.kind() {
                TokenKind::EndObject => {
                    self.advance()?;
                    return Ok(SeekResult::NotMatch);
                }
                TokenKind::String => {
                    let key = self.read_string()?;
                    if !self.eat_separator(TokenKind::Colon)? {
                        return Err(self.error("expected ':'"));
                    }
                    if fnv1a_64(&key) == hash && key == name {
                        return Ok(self.value_kind());
                    }
                    self.skip_value()?;
                    self.eat_separator(TokenKind::Comma)?;
                }
                _ => return Err(self.error("expected an object key")),
            }
        }
    }

    fn seek_deep(&mut self, name: &str, hash: u64) -> Result<SeekResult, Error> {
        let scope = match self.deep_scope {
            Some(scope) => scope,
            None => {
                if !matches!(self.kind(), TokenKind::BeginObject | TokenKind::BeginArray) {
                    self.skip_value()?;
                    return Ok(SeekResult::NotMatch);
                }
                self.deep_scope = Some(self.depth);
                self.depth
            }
        };
        loop {
            match self.kind() {
                TokenKind::Eof => {
                    self.deep_scope = None;
                    return Ok(SeekResult::NotMatch);
                }
                TokenKind::EndObject | TokenKind::EndArray => {
                    self.advance()?;
                    if self.depth == scope {
                        self.deep_scope = None;
                        return Ok(SeekResult::NotMatch);
                    }
                }
                TokenKind::String => {
                    let key = self.read_string()?;
                    if self.eat_separator(TokenKind::Colon)? && fnv1a_64(&key) == hash && key == name {
                        return Ok(self.value_kind());
                    }
                }
                _ => self.advance()?,
            }
        }
    }
}

impl<'a> TokenCursor for JsonCursor<'a> {
    fn kind(&self) -> TokenKind {
        match self.bytes.get(self.pos) {
            None => TokenKind::Eof,
            Some(b'{') => TokenKind::BeginObject,
            Some(b'}') => TokenKind::EndObject,
            Some(b'[') => TokenKind::BeginArray,
            Some(b']') => TokenKind::EndArray,
            Some(b'"') => TokenKind::String,
            Some(b',') => TokenKind::Comma,
            Some(b':') => TokenKind::Colon,
            Some(b't') => TokenKind::True,
            Some(b'f') => TokenKind::False,
            Some(b'n') => TokenKind::Null,
            Some(b'-' | b'0'..=b'9') => TokenKind::Number,
            Some(_) => TokenKind::Invalid,
        }
    }

    fn advance(&mut self) -> Result<(), Error> {
        match self.kind() {
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            TokenKind::Invalid => return Err(self.error("unexpected byte")),
            TokenKind::BeginObject | TokenKind::BeginArray => {
                self.depth += 1;
                self.pos += 1;
            }
            TokenKind::EndObject | TokenKind::EndArray => {
                self.depth = self.depth.saturating_sub(1);
                self.pos += 1;
            }
            TokenKind::Comma | TokenKind::Colon => self.pos += 1,
            TokenKind::String => self.pos = self.string_end(self.pos)?,
            TokenKind::Number | TokenKind::True | TokenKind::False | TokenKind::Null => {
                self.pos = self.scalar_end(self.pos)
            }
        }
        self.skip_ws();
        Ok(())
    }

    fn seek_to_field(&mut self, name: &str, hash: u64, deep: bool) -> Result<SeekResult, Error> {
        if deep {
            self.seek_deep(name, hash)
        } else {
            self.seek_in_object(name, hash)
        }
    }

    fn seek_to_index(&mut self, index: usize) -> Result<bool, Error> {
        if self.kind() != TokenKind::BeginArray {
            self.skip_value()?;
            return Ok(false);
        }
        self.advance()?;
        let mut current = 0;
        loop {
            if self.kind() == TokenKind::EndArray {
                self.advance()?;
                return Ok(false);
            }
            if current == index {
                return Ok(true);
            }
            self.skip_value()?;
            self.eat_separator(TokenKind::Comma)?;
            current += 1;
        }
    }

    fn skip_value(&mut self) -> Result<(), Error> {
        self.pos = self.value_end()?;
        self.skip_ws();
        Ok(())
    }

    fn exit_container(&mut self) -> Result<(), Error> {
        let target = self.depth.saturating_sub(1);
        loop {
            match self.kind() {
                TokenKind::EndObject | TokenKind::EndArray => {
                    self.advance()?;
                    if self.depth == target {
                        return Ok(());
                    }
                }
                TokenKind::BeginObject | TokenKind::BeginArray | TokenKind::String => self.skip_value()?,
                _ => self.advance()?,
            }
        }
    }

    fn read_value(&mut self) -> Result<Value, Error> {
        let end = self.value_end()?;
        let json: serde_json::Value = serde_json::from_slice(&self.bytes[self.pos..end])?;
        self.pos = end;
        self.skip_ws();
        Ok(Value::from(json))
    }
}
