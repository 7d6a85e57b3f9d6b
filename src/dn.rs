//! Distinguished names (RFC 4514).
//!
//! Only what query validation needs: parsing, normalized comparison, and
//! ancestry checks used to keep DN-keyed lookups inside a query's base.

use crate::error::{ConfigError, ConfigResult};
use std::fmt;
use std::str::FromStr;

/// One `type=value` pair inside a relative distinguished name.
#[derive(Debug, Clone)]
pub struct AttributeTypeAndValue {
    attr_type: String,
    value: String,
}

impl AttributeTypeAndValue {
    /// Attribute type, lowercased.
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// Unescaped attribute value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn matches(&self, other: &Self) -> bool {
        self.attr_type == other.attr_type
            && self.value.to_lowercase() == other.value.to_lowercase()
    }
}

/// A parsed distinguished name. The empty DN denotes the directory root.
#[derive(Debug, Clone, Default)]
pub struct Dn {
    // Leaf first; multi-valued RDNs are kept sorted by attribute type.
    rdns: Vec<Vec<AttributeTypeAndValue>>,
}

impl Dn {
    /// Parse a DN string.
    pub fn parse(input: &str) -> ConfigResult<Self> {
        let trimmed = trim_unescaped(input);
        if trimmed.is_empty() {
            return Ok(Self::default());
        }

        let mut rdns = Vec::new();
        for raw_rdn in split_unescaped(trimmed, ',').map_err(|r| ConfigError::invalid_dn(input, r))? {
            let mut rdn = Vec::new();
            for raw_ava in
                split_unescaped(raw_rdn, '+').map_err(|r| ConfigError::invalid_dn(input, r))?
            {
                rdn.push(parse_ava(raw_ava).map_err(|r| ConfigError::invalid_dn(input, r))?);
            }
            rdn.sort_by(|a, b| a.attr_type.cmp(&b.attr_type));
            rdns.push(rdn);
        }

        Ok(Self { rdns })
    }

    /// Whether this is the root (empty) DN.
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Number of RDN components.
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// The leaf RDN's components, if any.
    pub fn leaf(&self) -> Option<&[AttributeTypeAndValue]> {
        self.rdns.first().map(Vec::as_slice)
    }

    /// The DN one level up, or `None` at the root.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Dn {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    /// Whether `self` equals `base` or sits anywhere below it.
    pub fn is_within(&self, base: &Dn) -> bool {
        if base.rdns.len() > self.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - base.rdns.len();
        self.rdns[offset..]
            .iter()
            .zip(&base.rdns)
            .all(|(a, b)| rdn_matches(a, b))
    }

    /// Whether `self` sits strictly below `base`.
    pub fn is_descendant_of(&self, base: &Dn) -> bool {
        self.rdns.len() > base.rdns.len() && self.is_within(base)
    }

    /// Whether `self` is an immediate child of `base`.
    pub fn is_child_of(&self, base: &Dn) -> bool {
        self.rdns.len() == base.rdns.len() + 1 && self.is_within(base)
    }

    /// Iterate over every attribute value named in the DN.
    pub fn values(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.rdns.iter().flatten()
    }
}

fn rdn_matches(a: &[AttributeTypeAndValue], b: &[AttributeTypeAndValue]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns.len() == other.rdns.len() && self.is_within(other)
    }
}

impl Eq for Dn {}

impl FromStr for Dn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dn::parse(s)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            for (j, ava) in rdn.iter().enumerate() {
                if j > 0 {
                    f.write_str("+")?;
                }
                write!(f, "{}={}", ava.attr_type, escape_dn_value(&ava.value))?;
            }
        }
        Ok(())
    }
}

/// Split on `separator` where it is not preceded by a backslash.
fn split_unescaped(input: &str, separator: char) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == separator {
            parts.push(&input[start..i]);
            start = i + 1;
        }
    }
    if escaped {
        return Err("trailing escape character".to_string());
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn parse_ava(raw: &str) -> Result<AttributeTypeAndValue, String> {
    let (attr_type, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("component '{}' is missing '='", raw.trim()))?;

    let attr_type = attr_type.trim();
    if attr_type.is_empty() {
        return Err(format!("component '{}' has an empty attribute type", raw.trim()));
    }
    if !attr_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(format!("invalid attribute type '{}'", attr_type));
    }

    Ok(AttributeTypeAndValue {
        attr_type: attr_type.to_ascii_lowercase(),
        value: unescape_dn_value(trim_unescaped(value))?,
    })
}

/// Trim surrounding whitespace, keeping a trailing space that is escaped.
fn trim_unescaped(raw: &str) -> &str {
    let start = raw.trim_start();
    let trimmed = start.trim_end();
    let backslashes = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    if backslashes % 2 == 0 {
        return trimmed;
    }
    let escaped = start[trimmed.len()..]
        .chars()
        .next()
        .map_or(0, char::len_utf8);
    &start[..trimmed.len() + escaped]
}

fn unescape_dn_value(raw: &str) -> Result<String, String> {
    let raw = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);

    let mut bytes = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let next = chars.next().ok_or("trailing escape character")?;
        if next.is_ascii_hexdigit() {
            let low = chars
                .next()
                .filter(char::is_ascii_hexdigit)
                .ok_or("incomplete hex escape")?;
            let pair = format!("{}{}", next, low);
            let byte = u8::from_str_radix(&pair, 16).map_err(|e| e.to_string())?;
            bytes.push(byte);
        } else {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
        }
    }

    String::from_utf8(bytes).map_err(|_| "escaped value is not valid UTF-8".to_string())
}

/// Escape a DN attribute value per RFC 4514.
pub fn escape_dn_value(value: &str) -> String {
    let char_count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == char_count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}
