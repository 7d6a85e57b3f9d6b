//! Directory entries as seen by the sync capabilities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pseudo attribute that resolves to an entry's distinguished name.
pub const DN_ATTRIBUTE: &str = "dn";

/// Whether an attribute name refers to the entry DN rather than a stored attribute.
pub fn is_dn_attribute(name: &str) -> bool {
    name.eq_ignore_ascii_case(DN_ATTRIBUTE)
}

/// A single directory object with multi-valued attributes.
///
/// Attribute names are matched case-insensitively, as LDAP does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: String,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<String>>,
}

impl Entry {
    /// Create an entry with no attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter, replacing any existing values.
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.set_attribute(name, values);
        self
    }

    /// Replace the values of an attribute.
    pub fn set_attribute<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let existing = self
            .attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&name))
            .cloned();
        if let Some(key) = existing {
            self.attributes.remove(&key);
        }
        self.attributes
            .insert(name, values.into_iter().map(Into::into).collect());
    }

    /// The entry's distinguished name.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All values of an attribute. `dn` yields the entry DN.
    pub fn values(&self, name: &str) -> Vec<&str> {
        if is_dn_attribute(name) {
            return vec![self.dn.as_str()];
        }
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// First value of an attribute, if any.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        if is_dn_attribute(name) {
            return Some(self.dn.as_str());
        }
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// First non-empty value found by walking `names` in order.
    pub fn first_non_empty<S: AsRef<str>>(&self, names: &[S]) -> Option<&str> {
        names.iter().find_map(|name| {
            self.values(name.as_ref())
                .into_iter()
                .find(|value| !value.is_empty())
        })
    }

    /// Whether the attribute is present with at least one value.
    pub fn has_attribute(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Names of the stored attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Iterate over every stored `(name, values)` pair.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Copy of the entry carrying only the requested attributes.
    ///
    /// An empty request keeps everything.
    pub fn project<S: AsRef<str>>(&self, requested: &[S]) -> Entry {
        if requested.is_empty() {
            return self.clone();
        }
        let attributes = self
            .attributes
            .iter()
            .filter(|(k, _)| requested.iter().any(|r| r.as_ref().eq_ignore_ascii_case(k)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Entry {
            dn: self.dn.clone(),
            attributes,
        }
    }
}
