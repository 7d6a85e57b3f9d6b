//! Search filters (RFC 4515).
//!
//! Filters are parsed up front so a malformed query is a configuration error,
//! never a directory round-trip. The parsed form renders back to the string
//! representation sent to the server and can be evaluated locally against an
//! [`Entry`], which is what the in-memory directory does.
//!
//! ```rust
//! use group_sync_builders::filter::Filter;
//!
//! let filter = Filter::parse("(&(objectClass=posixGroup)(cn=ops*))").unwrap();
//! assert_eq!(filter.to_string(), "(&(objectClass=posixGroup)(cn=ops*))");
//! ```

use crate::entry::Entry;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All sub-filters match. `(&)` is absolute true.
    And(Vec<Filter>),
    /// Any sub-filter matches. `(|)` is absolute false.
    Or(Vec<Filter>),
    /// Negation
    Not(Box<Filter>),
    /// `(attr=value)`
    Equality { attribute: String, value: String },
    /// `(attr=initial*any*final)`
    Substrings {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
    /// `(attr>=value)`
    GreaterOrEqual { attribute: String, value: String },
    /// `(attr<=value)`
    LessOrEqual { attribute: String, value: String },
    /// `(attr=*)`
    Present { attribute: String },
    /// `(attr~=value)`
    Approx { attribute: String, value: String },
    /// `(attr:dn:rule:=value)`
    Extensible {
        attribute: Option<String>,
        matching_rule: Option<String>,
        dn_attributes: bool,
        value: String,
    },
}

/// Why a filter string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct FilterParseError {
    pub position: usize,
    pub message: String,
}

impl Filter {
    /// Parse a filter string. The outer parentheses are required.
    pub fn parse(input: &str) -> Result<Filter, FilterParseError> {
        let mut parser = Parser {
            input: input.trim().as_bytes(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(filter)
    }

    /// `(attr=value)`
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attr=*)`
    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Conjunction of the given filters.
    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluate the filter against an entry.
    ///
    /// Values compare case-insensitively; ordering comparisons are numeric
    /// when both sides parse as integers.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(entry)),
            Filter::Not(filter) => !filter.matches(entry),
            Filter::Equality { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| v.to_lowercase() == value.to_lowercase()),
            Filter::Substrings {
                attribute,
                initial,
                any,
                last,
            } => entry
                .values(attribute)
                .iter()
                .any(|v| substring_matches(v, initial.as_deref(), any, last.as_deref())),
            Filter::GreaterOrEqual { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| compare_values(v, value) != Ordering::Less),
            Filter::LessOrEqual { attribute, value } => entry
                .values(attribute)
                .iter()
                .any(|v| compare_values(v, value) != Ordering::Greater),
            Filter::Present { attribute } => entry.has_attribute(attribute),
            Filter::Approx { attribute, value } => {
                let wanted = squash(value);
                entry.values(attribute).iter().any(|v| squash(v) == wanted)
            }
            Filter::Extensible {
                attribute,
                dn_attributes,
                value,
                ..
            } => {
                let wanted = value.to_lowercase();
                let in_attributes = match attribute {
                    Some(attribute) => entry
                        .values(attribute)
                        .iter()
                        .any(|v| v.to_lowercase() == wanted),
                    None => entry
                        .attributes()
                        .flat_map(|(_, values)| values.iter())
                        .any(|v| v.to_lowercase() == wanted),
                };
                in_attributes || (*dn_attributes && dn_has_value(entry, attribute.as_deref(), &wanted))
            }
        }
    }
}

fn dn_has_value(entry: &Entry, attribute: Option<&str>, wanted: &str) -> bool {
    let Ok(dn) = crate::dn::Dn::parse(entry.dn()) else {
        return false;
    };
    dn.values().any(|ava| {
        attribute.is_none_or(|a| a.eq_ignore_ascii_case(ava.attr_type()))
            && ava.value().to_lowercase() == wanted
    })
}

fn substring_matches(value: &str, initial: Option<&str>, any: &[String], last: Option<&str>) -> bool {
    let value = value.to_lowercase();
    let mut rest = value.as_str();

    if let Some(initial) = initial {
        let initial = initial.to_lowercase();
        match rest.strip_prefix(initial.as_str()) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for piece in any {
        let piece = piece.to_lowercase();
        match rest.find(piece.as_str()) {
            Some(idx) => rest = &rest[idx + piece.len()..],
            None => return false,
        }
    }
    match last {
        Some(last) => rest.ends_with(last.to_lowercase().as_str()),
        None => true,
    }
}

fn compare_values(actual: &str, wanted: &str) -> Ordering {
    match (actual.parse::<i64>(), wanted.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => actual.to_lowercase().cmp(&wanted.to_lowercase()),
    }
}

fn squash(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Escape a literal value for inclusion in a filter (RFC 4515 section 3).
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                f.write_str("(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                f.write_str(")")
            }
            Filter::Or(filters) => {
                f.write_str("(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                f.write_str(")")
            }
            Filter::Not(filter) => write!(f, "(!{})", filter),
            Filter::Equality { attribute, value } => {
                write!(f, "({}={})", attribute, escape_value(value))
            }
            Filter::Substrings {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({}=", attribute)?;
                if let Some(initial) = initial {
                    f.write_str(&escape_value(initial))?;
                }
                f.write_str("*")?;
                for piece in any {
                    write!(f, "{}*", escape_value(piece))?;
                }
                if let Some(last) = last {
                    f.write_str(&escape_value(last))?;
                }
                f.write_str(")")
            }
            Filter::GreaterOrEqual { attribute, value } => {
                write!(f, "({}>={})", attribute, escape_value(value))
            }
            Filter::LessOrEqual { attribute, value } => {
                write!(f, "({}<={})", attribute, escape_value(value))
            }
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
            Filter::Approx { attribute, value } => {
                write!(f, "({}~={})", attribute, escape_value(value))
            }
            Filter::Extensible {
                attribute,
                matching_rule,
                dn_attributes,
                value,
            } => {
                f.write_str("(")?;
                if let Some(attribute) = attribute {
                    f.write_str(attribute)?;
                }
                if *dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = matching_rule {
                    write!(f, ":{}", rule)?;
                }
                write!(f, ":={})", escape_value(value))
            }
        }
    }
}

impl FromStr for Filter {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> FilterParseError {
        FilterParseError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), FilterParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterParseError> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterParseError> {
        let mut filters = Vec::new();
        while self.peek() == Some(b'(') {
            filters.push(self.filter()?);
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter, FilterParseError> {
        let attribute = self.attribute_description();

        match self.peek() {
            Some(b'~') => {
                self.pos += 1;
                self.expect(b'=')?;
                let attribute = self.require_attribute(attribute)?;
                let value = unescape(self.raw_value()?).map_err(|m| self.error(m))?;
                Ok(Filter::Approx { attribute, value })
            }
            Some(b'>') => {
                self.pos += 1;
                self.expect(b'=')?;
                let attribute = self.require_attribute(attribute)?;
                let value = unescape(self.raw_value()?).map_err(|m| self.error(m))?;
                Ok(Filter::GreaterOrEqual { attribute, value })
            }
            Some(b'<') => {
                self.pos += 1;
                self.expect(b'=')?;
                let attribute = self.require_attribute(attribute)?;
                let value = unescape(self.raw_value()?).map_err(|m| self.error(m))?;
                Ok(Filter::LessOrEqual { attribute, value })
            }
            Some(b':') => self.extensible(attribute),
            Some(b'=') => {
                self.pos += 1;
                let attribute = self.require_attribute(attribute)?;
                self.equality_or_substrings(attribute)
            }
            _ => Err(self.error("expected a filter operator")),
        }
    }

    fn extensible(&mut self, attribute: String) -> Result<Filter, FilterParseError> {
        let mut dn_attributes = false;
        let mut matching_rule = None;

        // Each round consumes one ':'-prefixed segment until ":=" is reached.
        loop {
            self.expect(b':')?;
            if self.peek() == Some(b'=') {
                self.pos += 1;
                break;
            }
            let segment = self.attribute_description();
            if segment.is_empty() {
                return Err(self.error("empty extensible match segment"));
            }
            if segment.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
                dn_attributes = true;
            } else if matching_rule.is_none() {
                matching_rule = Some(segment);
            } else {
                return Err(self.error("too many extensible match segments"));
            }
        }

        if attribute.is_empty() && matching_rule.is_none() {
            return Err(self.error("extensible match without attribute needs a matching rule"));
        }

        let value = unescape(self.raw_value()?).map_err(|m| self.error(m))?;
        Ok(Filter::Extensible {
            attribute: (!attribute.is_empty()).then_some(attribute),
            matching_rule,
            dn_attributes,
            value,
        })
    }

    fn equality_or_substrings(&mut self, attribute: String) -> Result<Filter, FilterParseError> {
        let raw = self.raw_value()?;
        if raw == "*" {
            return Ok(Filter::Present { attribute });
        }

        let pieces = split_wildcards(raw);
        if pieces.len() == 1 {
            let value = unescape(raw).map_err(|m| self.error(m))?;
            return Ok(Filter::Equality { attribute, value });
        }

        let last_index = pieces.len() - 1;
        let mut initial = None;
        let mut any = Vec::new();
        let mut last = None;
        for (i, piece) in pieces.into_iter().enumerate() {
            if piece.is_empty() {
                continue;
            }
            let value = unescape(piece).map_err(|m| self.error(m))?;
            if i == 0 {
                initial = Some(value);
            } else if i == last_index {
                last = Some(value);
            } else {
                any.push(value);
            }
        }
        Ok(Filter::Substrings {
            attribute,
            initial,
            any,
            last,
        })
    }

    fn attribute_description(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b';' || b == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn require_attribute(&self, attribute: String) -> Result<String, FilterParseError> {
        if attribute.is_empty() {
            Err(self.error("missing attribute description"))
        } else {
            Ok(attribute)
        }
    }

    /// Raw, still-escaped assertion value up to the closing parenthesis.
    fn raw_value(&mut self) -> Result<&'a str, FilterParseError> {
        let input: &'a [u8] = self.input;
        let start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b')' => break,
                b'(' => return Err(self.error("unescaped '(' in value")),
                b'\\' => {
                    let hex = self.input.get(self.pos + 1..self.pos + 3);
                    if !hex.is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit)) {
                        return Err(self.error("invalid escape sequence in value"));
                    }
                    self.pos += 3;
                }
                _ => self.pos += 1,
            }
        }
        if self.peek().is_none() {
            return Err(self.error("unterminated filter value"));
        }
        std::str::from_utf8(&input[start..self.pos])
            .map_err(|_| self.error("value is not valid UTF-8"))
    }
}

fn split_wildcards(raw: &str) -> Vec<&str> {
    // Escapes are always `\XX`, so a literal '*' never follows a backslash.
    raw.split('*').collect()
}

fn unescape(raw: &str) -> Result<String, String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let pair = raw
                .get(i + 1..i + 3)
                .ok_or_else(|| "incomplete escape sequence".to_string())?;
            let byte = u8::from_str_radix(pair, 16).map_err(|e| e.to_string())?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| "escaped value is not valid UTF-8".to_string())
}
