//! Validated search queries keyed on a return attribute.
//!
//! [`AttributeQuery`] is the immutable descriptor derived from a
//! [`QueryDefinition`] plus the attribute that identifies entries found by it.
//! Construction parses the base DN and filter and checks the scope and alias
//! settings, so every failure surfaces before a connection is opened.

use crate::config::QueryDefinition;
use crate::directory::SearchRequest;
use crate::dn::Dn;
use crate::entry::{Entry, is_dn_attribute};
use crate::error::{ConfigError, ConfigResult, SyncError, SyncResult};
use crate::filter::Filter;
use std::fmt;
use std::str::FromStr;

/// How deep a search reaches below its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// The base entry only
    Base,
    /// Immediate children of the base
    OneLevel,
    /// The base and everything below it
    #[default]
    Subtree,
}

impl FromStr for Scope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "sub" => Ok(Scope::Subtree),
            "one" => Ok(Scope::OneLevel),
            "base" => Ok(Scope::Base),
            _ => Err(ConfigError::InvalidScope(s.to_string())),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scope::Base => "base",
            Scope::OneLevel => "one",
            Scope::Subtree => "sub",
        })
    }
}

/// When the server dereferences aliases during a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DerefAliases {
    #[default]
    Never,
    /// While searching below the base
    Searching,
    /// While locating the base
    Finding,
    Always,
}

impl FromStr for DerefAliases {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "never" => Ok(DerefAliases::Never),
            "search" => Ok(DerefAliases::Searching),
            "base" => Ok(DerefAliases::Finding),
            "always" => Ok(DerefAliases::Always),
            _ => Err(ConfigError::InvalidDerefAliases(s.to_string())),
        }
    }
}

/// A compiled [`QueryDefinition`].
#[derive(Debug, Clone)]
pub struct LdapQuery {
    base_dn: Dn,
    scope: Scope,
    deref_aliases: DerefAliases,
    time_limit: u32,
    filter: Filter,
    page_size: u32,
}

impl LdapQuery {
    /// Compile a query definition.
    pub fn new(definition: &QueryDefinition) -> ConfigResult<Self> {
        let base_dn = Dn::parse(&definition.base_dn)?;
        let scope = definition.scope.parse()?;
        let deref_aliases = definition.deref_aliases.parse()?;
        let filter = Filter::parse(&definition.filter)
            .map_err(|e| ConfigError::invalid_filter(&definition.filter, e.to_string()))?;

        Ok(Self {
            base_dn,
            scope,
            deref_aliases,
            time_limit: definition.time_limit,
            filter,
            page_size: definition.page_size,
        })
    }

    pub fn base_dn(&self) -> &Dn {
        &self.base_dn
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    fn request(&self, base_dn: Dn, scope: Scope, filter: Filter, attributes: &[String]) -> SearchRequest {
        SearchRequest {
            base_dn,
            scope,
            deref_aliases: self.deref_aliases,
            time_limit: self.time_limit,
            filter,
            attributes: attributes.to_vec(),
            page_size: self.page_size,
        }
    }
}

/// A query whose results are identified by the value of one attribute.
///
/// Keying on `dn` means the entry DN is the identifier; single-entry lookups
/// then become base-scope searches at that DN.
#[derive(Debug, Clone)]
pub struct AttributeQuery {
    query: LdapQuery,
    attribute: String,
}

impl AttributeQuery {
    /// Compile `definition` and key it on `attribute`.
    pub fn new(definition: &QueryDefinition, attribute: &str) -> ConfigResult<Self> {
        let attribute = attribute.trim();
        if attribute.is_empty() {
            return Err(ConfigError::empty_attribute("query attribute"));
        }
        Ok(Self {
            query: LdapQuery::new(definition)?,
            attribute: attribute.to_string(),
        })
    }

    /// The attribute entries are keyed on.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn query(&self) -> &LdapQuery {
        &self.query
    }

    /// Whether the entry DN is the identifier.
    pub fn keyed_on_dn(&self) -> bool {
        is_dn_attribute(&self.attribute)
    }

    /// The identifier of an entry found by this query.
    pub fn key_of<'e>(&self, entry: &'e Entry) -> Option<&'e str> {
        entry.first_value(&self.attribute).filter(|v| !v.is_empty())
    }

    /// Request listing every entry the query selects.
    pub fn search_all(&self, attributes: &[String]) -> SearchRequest {
        self.query.request(
            self.query.base_dn.clone(),
            self.query.scope,
            self.query.filter.clone(),
            attributes,
        )
    }

    /// Request selecting the single entry identified by `value`.
    pub fn search_for(&self, value: &str, attributes: &[String]) -> SyncResult<SearchRequest> {
        if self.keyed_on_dn() {
            let dn = Dn::parse(value).map_err(|error| SyncError::InvalidDn {
                value: value.to_string(),
                reason: match error {
                    ConfigError::InvalidDn { reason, .. } => reason,
                    other => other.to_string(),
                },
            })?;
            if !dn.is_within(&self.query.base_dn) {
                return Err(SyncError::QueryOutOfBounds {
                    dn: value.to_string(),
                    base_dn: self.query.base_dn.to_string(),
                });
            }
            return Ok(self
                .query
                .request(dn, Scope::Base, self.query.filter.clone(), attributes));
        }

        let filter = Filter::and(vec![
            self.query.filter.clone(),
            Filter::equality(&self.attribute, value),
        ]);
        Ok(self.query.request(
            self.query.base_dn.clone(),
            self.query.scope,
            filter,
            attributes,
        ))
    }
}
