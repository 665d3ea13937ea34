use crate::ast::{CompiledPath, Filter, Logic, Operand, Operator, Segment};
use crate::error::Error;
use crate::lexer::{is_ident_byte, Lexer, Number};
use crate::runtime::pattern::{LikePattern, Pattern};
use crate::types::Value;

/// Compile path text into segments.
pub fn parse(text: &str, ignore_null_value: bool) -> Result<CompiledPath, Error> {
    Parser::new(text, ignore_null_value).parse()
}

pub struct Parser<'a> {
    text: &'a str,
    lexer: Lexer<'a>,
    has_ref: bool,
    ignore_null_value: bool,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str, ignore_null_value: bool) -> Self {
        Self {
            text,
            lexer: Lexer::new(text),
            has_ref: false,
            ignore_null_value,
        }
    }

    pub fn parse(mut self) -> Result<CompiledPath, Error> {
        if self.text.trim().is_empty() {
            return Err(Error::syntax("Empty path", 0));
        }
        let segments = match self.single_char() {
            Some(segment) => vec![segment],
            None => self.parse_segments()?,
        };
        Ok(CompiledPath::new(
            self.text,
            segments,
            self.has_ref,
            self.ignore_null_value,
        ))
    }

    /// One-character paths: `*`, a digit index or a single-letter name.
    fn single_char(&self) -> Option<Segment> {
        match self.text.as_bytes() {
            [b'*'] => Some(Segment::Wildcard { deep: false, object_only: false }),
            [d @ b'0'..=b'9'] => Some(Segment::ArrayIndex((d - b'0') as i64)),
            [c @ (b'a'..=b'z' | b'A'..=b'Z' | b'_')] => {
                Some(Segment::property((*c as char).to_string(), false))
            }
            _ => None,
        }
    }

    fn parse_segments(&mut self) -> Result<Vec<Segment>, Error> {
        let mut segments = Vec::new();
        self.lexer.skip_ws();
        self.lexer.eat(b'$');
        loop {
            self.lexer.skip_ws();
            if self.lexer.at_end() {
                break;
            }
            if let Some(segment) = self.parse_segment(segments.is_empty())? {
                segments.push(segment);
            }
        }
        Ok(segments)
    }

    fn parse_segment(&mut self, first: bool) -> Result<Option<Segment>, Error> {
        let start = self.lexer.pos();
        match self.lexer.peek() {
            Some(b'.' | b'/') => self.parse_child(),
            Some(b'[') => self.parse_bracket().map(Some),
            Some(b'?') => {
                self.lexer.bump();
                Ok(Some(Segment::Filter(self.parse_filter_expr()?)))
            }
            Some(b) if first && (b == b'\\' || is_ident_byte(b)) => {
                Ok(Some(Segment::property(self.lexer.read_name()?, false)))
            }
            Some(b) => Err(Error::syntax(format!("Unexpected '{}'", b as char), start)),
            None => Ok(None),
        }
    }

    /// `.name`, `..name`, `.*`, `..*`, `.0`, `.fn()` and the `/` separated forms.
    fn parse_child(&mut self) -> Result<Option<Segment>, Error> {
        let separator = self.lexer.bump();
        let mut deep = false;
        if separator == Some(b'.') && self.lexer.eat(b'.') {
            deep = true;
            if self.lexer.rest().starts_with("[*].") {
                self.lexer.advance_by(4);
            }
        }
        if self.lexer.at_end() {
            return match separator {
                Some(b'/') if !deep => Ok(None),
                _ => Err(self.lexer.error("Unexpected end of path")),
            };
        }

        match self.lexer.peek() {
            Some(b'*') => {
                self.lexer.bump();
                Ok(Some(Segment::Wildcard { deep, object_only: false }))
            }
            Some(b'[') if deep => Ok(Some(Segment::Wildcard { deep: true, object_only: true })),
            Some(b'0'..=b'9' | b'-') if !deep => self.parse_dotted_index().map(Some),
            _ => {
                let name = self.lexer.read_name()?;
                if self.lexer.peek() == Some(b'(') {
                    return self.parse_function(&name).map(Some);
                }
                Ok(Some(Segment::property(name, deep)))
            }
        }
    }

    fn parse_dotted_index(&mut self) -> Result<Segment, Error> {
        let start = self.lexer.pos();
        self.lexer.eat(b'-');
        while matches!(self.lexer.peek(), Some(b'0'..=b'9')) {
            self.lexer.bump();
        }
        let raw = &self.text[start..self.lexer.pos()];
        match raw.parse::<i64>() {
            Ok(index) => Ok(Segment::ArrayIndex(index)),
            Err(_) if raw == "-" => Err(Error::syntax("Unexpected '-'", start)),
            Err(_) => Ok(Segment::property(raw, false)),
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Segment, Error> {
        self.lexer.expect(b'(')?;
        self.lexer.skip_ws();
        self.lexer.expect(b')')?;
        match name {
            "size" | "length" => Ok(Segment::Size),
            "type" => Ok(Segment::Type),
            "floor" => Ok(Segment::Floor),
            "max" => Ok(Segment::Max),
            "min" => Ok(Segment::Min),
            "keySet" => Ok(Segment::KeySet),
            other => Err(Error::unsupported(format!("function {}()", other))),
        }
    }

    fn parse_bracket(&mut self) -> Result<Segment, Error> {
        self.lexer.expect(b'[')?;
        self.lexer.skip_ws();
        let segment = match self.lexer.peek() {
            Some(b'?') => {
                self.lexer.bump();
                Segment::Filter(self.parse_filter_expr()?)
            }
            Some(b'*') => {
                self.lexer.bump();
                Segment::Wildcard { deep: false, object_only: false }
            }
            Some(b'\'' | b'"') => self.parse_quoted_names()?,
            Some(b) if b == b'\\' || (is_ident_byte(b) && !b.is_ascii_digit()) => {
                let name = self.lexer.read_name()?;
                if name == "last" {
                    Segment::MultiIndex(vec![-1])
                } else {
                    Segment::property(name, false)
                }
            }
            _ => {
                let start = self.lexer.pos();
                let raw = self.lexer.read_until(b']')?;
                index_segment(raw.trim(), start)?
            }
        };
        self.lexer.skip_ws();
        self.lexer.expect(b']')?;
        Ok(segment)
    }

    fn parse_quoted_names(&mut self) -> Result<Segment, Error> {
        let mut names = vec![self.lexer.read_string()?];
        loop {
            self.lexer.skip_ws();
            if !self.lexer.eat(b',') {
                break;
            }
            self.lexer.skip_ws();
            names.push(self.lexer.read_string()?);
        }
        if names.len() == 1 {
            Ok(Segment::property(names.remove(0), false))
        } else {
            Ok(Segment::MultiProperty(names))
        }
    }

    // Filter expressions chain left to right; parentheses are the only grouping.
    fn parse_filter_expr(&mut self) -> Result<Filter, Error> {
        let mut left = self.parse_filter_term()?;
        loop {
            self.lexer.skip_ws();
            let rest = self.lexer.rest();
            let logic = if rest.starts_with("&&") {
                Logic::And
            } else if rest.starts_with("||") {
                Logic::Or
            } else {
                break;
            };
            self.lexer.advance_by(2);
            let right = self.parse_filter_term()?;
            left = Filter::Group {
                left: Box::new(left),
                right: Box::new(right),
                logic,
            };
        }
        Ok(left)
    }

    fn parse_filter_term(&mut self) -> Result<Filter, Error> {
        self.lexer.skip_ws();
        if self.lexer.eat(b'(') {
            let inner = self.parse_filter_expr()?;
            self.lexer.skip_ws();
            self.lexer.expect(b')')?;
            return Ok(inner);
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Filter, Error> {
        let operand = self.parse_operand()?;
        self.lexer.skip_ws();
        if matches!(self.lexer.peek(), None | Some(b')' | b']' | b'&' | b'|')) {
            return Ok(Filter::NotNull(operand));
        }
        let op = self.parse_operator()?;
        self.lexer.skip_ws();
        self.parse_operand_rhs(operand, op)
    }

    fn parse_operand(&mut self) -> Result<Operand, Error> {
        if self.lexer.eat(b'@') {
            self.lexer.expect(b'.')?;
        }
        let name = self.lexer.read_name()?;
        if self.lexer.peek() == Some(b'(') {
            let start = self.lexer.pos();
            self.lexer.bump();
            self.lexer.skip_ws();
            self.lexer.expect(b')')?;
            return match name.as_str() {
                "size" | "length" => Ok(Operand::Size),
                "type" => Ok(Operand::Type),
                other => Err(Error::unsupported(format!(
                    "function {}() in filter at position {}",
                    other, start
                ))),
            };
        }
        Ok(Operand::property(name))
    }

    fn parse_operator(&mut self) -> Result<Operator, Error> {
        let start = self.lexer.pos();
        let op = match self.lexer.peek() {
            Some(b'=') => {
                self.lexer.bump();
                if self.lexer.eat(b'~') {
                    Operator::RegMatch
                } else {
                    self.lexer.eat(b'=');
                    Operator::Eq
                }
            }
            Some(b'!') => {
                self.lexer.bump();
                self.lexer.expect(b'=')?;
                Operator::Ne
            }
            Some(b'<') => {
                self.lexer.bump();
                if self.lexer.eat(b'=') {
                    Operator::Le
                } else {
                    Operator::Lt
                }
            }
            Some(b'>') => {
                self.lexer.bump();
                if self.lexer.eat(b'=') {
                    Operator::Ge
                } else {
                    Operator::Gt
                }
            }
            _ if self.lexer.eat_keyword("not") => {
                self.lexer.skip_ws();
                if self.lexer.eat_keyword("like") {
                    Operator::NotLike
                } else if self.lexer.eat_keyword("rlike") {
                    Operator::NotRlike
                } else if self.lexer.eat_keyword("in") {
                    Operator::NotIn
                } else if self.lexer.eat_keyword("between") {
                    Operator::NotBetween
                } else {
                    return Err(Error::unsupported(format!(
                        "'not' followed by '{}'",
                        self.lexer.rest()
                    )));
                }
            }
            _ if self.lexer.eat_keyword("nin") => Operator::NotIn,
            _ if self.lexer.eat_keyword("like") => Operator::Like,
            _ if self.lexer.eat_keyword("rlike") => Operator::Rlike,
            _ if self.lexer.eat_keyword("in") => Operator::In,
            _ if self.lexer.eat_keyword("between") => Operator::Between,
            Some(b) if is_ident_byte(b) => {
                let word = self.lexer.read_name()?;
                return Err(Error::unsupported(format!("operator '{}'", word)));
            }
            Some(b) => return Err(Error::syntax(format!("Unexpected '{}'", b as char), start)),
            None => return Err(Error::syntax("Expected an operator", start)),
        };
        Ok(op)
    }

    fn parse_operand_rhs(&mut self, operand: Operand, op: Operator) -> Result<Filter, Error> {
        let start = self.lexer.pos();
        match op {
            Operator::Between | Operator::NotBetween => {
                let low = self.read_bound()?;
                self.lexer.skip_ws();
                if !self.lexer.eat_keyword("and") {
                    return Err(self.lexer.error("Expected 'and' in between"));
                }
                self.lexer.skip_ws();
                let high = self.read_bound()?;
                return Ok(Filter::Between {
                    operand,
                    low,
                    high,
                    not: op == Operator::NotBetween,
                });
            }
            Operator::In | Operator::NotIn => {
                return self.parse_in_list(operand, op == Operator::NotIn);
            }
            Operator::RegMatch => {
                if self.lexer.peek() != Some(b'/') {
                    return Err(self.lexer.error("Expected /regex/ after '=~'"));
                }
                let (source, case_insensitive) = self.lexer.read_regex()?;
                let pattern = Pattern::new(&source, case_insensitive, start)?;
                return Ok(Filter::RegMatch { operand, pattern });
            }
            _ => {}
        }

        match self.lexer.peek() {
            Some(b'\'' | b'"') => {
                let value = self.lexer.read_string()?;
                match op {
                    Operator::Like | Operator::NotLike => {
                        let not = op == Operator::NotLike;
                        Ok(match LikePattern::compile(&value) {
                            Some(pattern) => Filter::Like { operand, pattern, not },
                            None => Filter::Str {
                                operand,
                                op: if not { Operator::Ne } else { Operator::Eq },
                                value: LikePattern::literal(&value),
                            },
                        })
                    }
                    Operator::Rlike | Operator::NotRlike => Ok(Filter::Rlike {
                        operand,
                        pattern: Pattern::new(&value, false, start)?,
                        not: op == Operator::NotRlike,
                    }),
                    _ => Ok(Filter::Str { operand, op, value }),
                }
            }
            Some(b'0'..=b'9' | b'-' | b'+') => {
                require_comparison(op, "a number")?;
                Ok(match self.lexer.read_number()? {
                    Number::Int(value) => Filter::Int { operand, op, value },
                    Number::Decimal(value) => Filter::Decimal { operand, op, value },
                })
            }
            Some(b'$') => {
                require_comparison(op, "a path")?;
                let raw = self.lexer.read_reference();
                let path = Parser::new(raw, self.ignore_null_value)
                    .parse()
                    .map_err(|e| match e {
                        Error::Syntax { message, position } => Error::syntax(message, start + position),
                        other => other,
                    })?;
                self.has_ref = true;
                Ok(Filter::Ref {
                    operand,
                    op,
                    path: Box::new(path),
                })
            }
            _ if self.lexer.eat_keyword("null") => match op {
                Operator::Eq => Ok(Filter::Null(operand)),
                Operator::Ne => Ok(Filter::NotNull(operand)),
                _ => Err(Error::unsupported("null only supports '==' and '!='")),
            },
            _ if self.lexer.eat_keyword("true") => bool_filter(operand, op, true),
            _ if self.lexer.eat_keyword("false") => bool_filter(operand, op, false),
            Some(b) => Err(Error::syntax(format!("Unexpected '{}'", b as char), start)),
            None => Err(Error::syntax("Expected a value", start)),
        }
    }

    fn read_bound(&mut self) -> Result<Value, Error> {
        match self.lexer.peek() {
            Some(b'0'..=b'9' | b'-' | b'+') => Ok(number_value(self.lexer.read_number()?)),
            _ => Err(Error::unsupported("between requires numeric bounds")),
        }
    }

    fn parse_in_list(&mut self, operand: Operand, not: bool) -> Result<Filter, Error> {
        self.lexer.expect(b'(')?;
        let mut items = Vec::new();
        loop {
            self.lexer.skip_ws();
            if items.is_empty() && self.lexer.eat(b')') {
                break;
            }
            let start = self.lexer.pos();
            let item = match self.lexer.peek() {
                Some(b'\'' | b'"') => Value::String(self.lexer.read_string()?),
                Some(b'0'..=b'9' | b'-' | b'+') => number_value(self.lexer.read_number()?),
                _ if self.lexer.eat_keyword("null") => Value::Null,
                _ if self.lexer.eat_keyword("true") => Value::Boolean(true),
                _ if self.lexer.eat_keyword("false") => Value::Boolean(false),
                Some(b) => return Err(Error::syntax(format!("Unexpected '{}'", b as char), start)),
                None => return Err(Error::syntax("Unterminated value list", start)),
            };
            items.push(item);
            self.lexer.skip_ws();
            if self.lexer.eat(b',') {
                continue;
            }
            self.lexer.expect(b')')?;
            break;
        }
        classify_in_list(operand, items, not)
    }
}

/// Bracket text that is neither a filter, a wildcard nor a name.
fn index_segment(raw: &str, start: usize) -> Result<Segment, Error> {
    if raw.is_empty() {
        return Err(Error::syntax("Empty brackets", start));
    }
    let parse_index = |text: &str| {
        text.trim()
            .parse::<i64>()
            .map_err(|_| Error::syntax(format!("Invalid index '{}'", text.trim()), start))
    };

    if raw.contains(',') {
        let indices = raw.split(',').map(parse_index).collect::<Result<Vec<_>, _>>()?;
        return Ok(Segment::MultiIndex(indices));
    }

    if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() > 3 {
            return Err(Error::syntax("Too many ':' in slice", start));
        }
        let bound = |i: usize, default: i64| match parts.get(i).map(|p| p.trim()) {
            Some(p) if !p.is_empty() => parse_index(p),
            _ => Ok(default),
        };
        let start_index = bound(0, 0)?;
        let end = bound(1, -1)?;
        let step = bound(2, 1)?;
        if step <= 0 {
            return Err(Error::syntax("Slice step must be greater than zero", start));
        }
        if end >= 0 && end < start_index {
            return Err(Error::syntax(
                format!("Slice end {} is before start {}", end, start_index),
                start,
            ));
        }
        return Ok(Segment::Range {
            start: start_index,
            end,
            step,
        });
    }

    match raw.parse::<i64>() {
        Ok(index) => Ok(Segment::ArrayIndex(index)),
        Err(_) => Ok(Segment::property(raw, false)),
    }
}

fn classify_in_list(operand: Operand, mut items: Vec<Value>, not: bool) -> Result<Filter, Error> {
    let single_op = if not { Operator::Ne } else { Operator::Eq };
    if items.len() == 1 {
        return match items.remove(0) {
            Value::Null if not => Ok(Filter::NotNull(operand)),
            Value::Null => Ok(Filter::Null(operand)),
            Value::Integer(value) => Ok(Filter::Int { operand, op: single_op, value }),
            Value::Decimal(value) => Ok(Filter::Decimal { operand, op: single_op, value }),
            Value::String(value) => Ok(Filter::Str { operand, op: single_op, value }),
            Value::Boolean(value) => Ok(Filter::Bool { operand, value, equal: !not }),
            other => Err(Error::unsupported(format!("'in' value {}", other))),
        };
    }

    if items.iter().all(|v| matches!(v, Value::Integer(_))) {
        let values = items.iter().filter_map(Value::as_i64).collect();
        return Ok(Filter::IntIn { operand, values, not });
    }
    if items.iter().all(|v| matches!(v, Value::String(_))) {
        let values = items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        return Ok(Filter::StrIn { operand, values, not });
    }
    if items.iter().all(|v| matches!(v, Value::Integer(_) | Value::Null)) {
        let values = items.iter().map(Value::as_i64).collect();
        return Ok(Filter::NullableIntIn { operand, values, not });
    }
    Err(Error::unsupported("'in' list mixes value types"))
}

fn require_comparison(op: Operator, what: &str) -> Result<(), Error> {
    if op.is_comparison() {
        Ok(())
    } else {
        Err(Error::unsupported(format!("{:?} against {}", op, what)))
    }
}

fn bool_filter(operand: Operand, op: Operator, value: bool) -> Result<Filter, Error> {
    match op {
        Operator::Eq => Ok(Filter::Bool { operand, value, equal: true }),
        Operator::Ne => Ok(Filter::Bool { operand, value, equal: false }),
        _ => Err(Error::unsupported("booleans only support '==' and '!='")),
    }
}

fn number_value(n: Number) -> Value {
    match n {
        Number::Int(i) => Value::Integer(i),
        Number::Decimal(d) => Value::Decimal(d),
    }
}
