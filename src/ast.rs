use crate::runtime::pattern::{LikePattern, Pattern};
use crate::types::Value;
use rust_decimal::Decimal;
use std::fmt;

/// One compiled step of a path expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Property { name: String, hash: u64, deep: bool },
    MultiProperty(Vec<String>),
    Wildcard { deep: bool, object_only: bool },
    ArrayIndex(i64),
    MultiIndex(Vec<i64>),
    Range { start: i64, end: i64, step: i64 },
    Filter(Filter),
    Size,
    Type,
    Floor,
    Max,
    Min,
    KeySet,
}

impl Segment {
    pub fn property(name: impl Into<String>, deep: bool) -> Self {
        let name = name.into();
        let hash = fnv1a_64(&name);
        Segment::Property { name, hash, deep }
    }

    /// Path functions produce a derived value rather than selecting nodes.
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Segment::Size | Segment::Type | Segment::Floor | Segment::Max | Segment::Min | Segment::KeySet
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    Rlike,
    NotRlike,
    In,
    NotIn,
    Between,
    NotBetween,
    RegMatch,
}

impl Operator {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }
}

/// What a filter predicate reads from each item.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Property { name: String, hash: u64 },
    /// `size()` / `length()` of the item itself.
    Size,
    /// `type()` of the item itself.
    Type,
}

impl Operand {
    pub fn property(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = fnv1a_64(&name);
        Operand::Property { name, hash }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

/// Filter predicate. Literal lists are stored in the narrowest representation
/// that holds them; every representation tests the same thing.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    NotNull(Operand),
    Null(Operand),
    Int { operand: Operand, op: Operator, value: i64 },
    Decimal { operand: Operand, op: Operator, value: Decimal },
    Str { operand: Operand, op: Operator, value: String },
    Bool { operand: Operand, value: bool, equal: bool },
    Like { operand: Operand, pattern: LikePattern, not: bool },
    Rlike { operand: Operand, pattern: Pattern, not: bool },
    RegMatch { operand: Operand, pattern: Pattern },
    IntIn { operand: Operand, values: Vec<i64>, not: bool },
    StrIn { operand: Operand, values: Vec<String>, not: bool },
    NullableIntIn { operand: Operand, values: Vec<Option<i64>>, not: bool },
    Between { operand: Operand, low: Value, high: Value, not: bool },
    /// Compares against another path evaluated from the root.
    Ref { operand: Operand, op: Operator, path: Box<CompiledPath> },
    Group { left: Box<Filter>, right: Box<Filter>, logic: Logic },
}

/// Parsed, immutable, cacheable form of a path string.
///
/// Holds no reference to any root; the same compiled path can be evaluated
/// against any number of trees, from any number of threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPath {
    text: String,
    segments: Vec<Segment>,
    has_ref_segment: bool,
    ignore_null_value: bool,
}

impl CompiledPath {
    pub(crate) fn new(text: &str, segments: Vec<Segment>, has_ref_segment: bool, ignore_null_value: bool) -> Self {
        Self {
            text: text.to_string(),
            segments,
            has_ref_segment,
            ignore_null_value,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when a filter compares against another `$...` path.
    pub fn has_ref_segment(&self) -> bool {
        self.has_ref_segment
    }

    /// When set, nulls are dropped while mapping a property over a sequence.
    pub fn ignore_null_value(&self) -> bool {
        self.ignore_null_value
    }
}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// 64-bit FNV-1a, used to pre-hash property names for the stream cursor.
pub const fn fnv1a_64(text: &str) -> u64 {
    let bytes = text.as_bytes();
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        i += 1;
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a_64(""), 0xcbf29ce484222325);
        assert_eq!(fnv1a_64("a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn property_precomputes_hash() {
        match Segment::property("name", false) {
            Segment::Property { hash, .. } => assert_eq!(hash, fnv1a_64("name")),
            other => panic!("unexpected segment {:?}", other),
        }
    }
}
