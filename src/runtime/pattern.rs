use crate::error::Error;
use regex::Regex;
use std::fmt;

/// A LIKE pattern split at compile time into anchored and floating fragments.
///
/// `%` is the only wildcard; `%%` matches a literal `%`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub contains: Vec<String>,
    min_len: usize,
}

impl LikePattern {
    /// Returns `None` when the pattern has no wildcard, in which case LIKE is
    /// plain equality against [`LikePattern::literal`].
    pub fn compile(pattern: &str) -> Option<Self> {
        let parts = split_fragments(pattern);
        if parts.len() == 1 {
            return None;
        }

        let last = parts.len() - 1;
        let starts_with = Some(parts[0].as_str()).filter(|s| !s.is_empty()).map(str::to_string);
        let ends_with = Some(parts[last].as_str()).filter(|s| !s.is_empty()).map(str::to_string);
        let contains: Vec<String> = parts[1..last]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        let min_len = starts_with.as_ref().map_or(0, String::len)
            + ends_with.as_ref().map_or(0, String::len)
            + contains.iter().map(String::len).sum::<usize>();

        Some(Self {
            starts_with,
            ends_with,
            contains,
            min_len,
        })
    }

    /// The text a wildcard-free pattern stands for, with `%%` unescaped.
    pub fn literal(pattern: &str) -> String {
        split_fragments(pattern).join("%")
    }

    pub fn matches(&self, text: &str) -> bool {
        if text.len() < self.min_len {
            return false;
        }
        let mut start = 0;
        if let Some(prefix) = &self.starts_with {
            if !text.starts_with(prefix.as_str()) {
                return false;
            }
            start = prefix.len();
        }
        for fragment in &self.contains {
            match text[start..].find(fragment.as_str()) {
                Some(idx) => start += idx + fragment.len(),
                None => return false,
            }
        }
        match &self.ends_with {
            Some(suffix) => text.ends_with(suffix.as_str()),
            None => true,
        }
    }
}

/// Split at bare `%` wildcards; `%%` stays inside its fragment as a literal `%`.
fn split_fragments(pattern: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' if chars.peek() == Some(&'%') => {
                chars.next();
                current.push('%');
            }
            '%' => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Regex used by `rlike` and `=~`; always matches the whole text.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    case_insensitive: bool,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str, case_insensitive: bool, position: usize) -> Result<Self, Error> {
        let flags = if case_insensitive { "(?i)" } else { "" };
        let regex = Regex::new(&format!("{}^(?:{})$", flags, source))
            .map_err(|e| Error::syntax(format!("Invalid regex: {}", e), position))?;
        Ok(Self {
            source: source.to_string(),
            case_insensitive,
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)?;
        if self.case_insensitive {
            f.write_str("i")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_fragments() {
        let p = LikePattern::compile("ab%cd%ef").unwrap();
        assert_eq!(p.starts_with.as_deref(), Some("ab"));
        assert_eq!(p.ends_with.as_deref(), Some("ef"));
        assert_eq!(p.contains, vec!["cd"]);

        let p = LikePattern::compile("%x%").unwrap();
        assert_eq!(p.starts_with, None);
        assert_eq!(p.ends_with, None);
        assert_eq!(p.contains, vec!["x"]);
    }

    #[test]
    fn no_wildcard_means_equality() {
        assert!(LikePattern::compile("plain").is_none());
        assert!(LikePattern::compile("100%%").is_none());
        assert_eq!(LikePattern::literal("100%%"), "100%");
    }

    #[test]
    fn doubled_percent_is_literal_inside_fragments() {
        let p = LikePattern::compile("%%%off").unwrap();
        assert_eq!(p.starts_with.as_deref(), Some("%"));
        assert_eq!(p.ends_with.as_deref(), Some("off"));
        assert!(p.matches("%50off"));
        assert!(!p.matches("50off"));
    }

    #[test]
    fn matching_is_forward_only() {
        let p = LikePattern::compile("a%b%c").unwrap();
        assert!(p.matches("abc"));
        assert!(p.matches("a-b-c"));
        assert!(!p.matches("acb"));
        assert!(!p.matches("ab"));

        let p = LikePattern::compile("%").unwrap();
        assert!(p.matches(""));
        assert!(p.matches("anything"));
    }

    #[test]
    fn regex_matches_whole_text() {
        let p = Pattern::new("a.c", false, 0).unwrap();
        assert!(p.is_match("abc"));
        assert!(!p.is_match("xabc"));
        let p = Pattern::new("ABC", true, 0).unwrap();
        assert!(p.is_match("abc"));
    }
}
