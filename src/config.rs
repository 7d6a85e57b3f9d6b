//! Sync configuration: RFC2307 schema description and connection parameters.
//!
//! Both types deserialize from the JSON shape used by sync configuration
//! files (camelCase keys) and can also be assembled with `with_*` setters.
//!
//! # Example
//!
//! ```rust
//! use group_sync_builders::config::SchemaConfig;
//!
//! let config = SchemaConfig::from_json(r#"{
//!     "groupsQuery": {
//!         "baseDN": "ou=groups,dc=example,dc=com",
//!         "filter": "(objectClass=posixGroup)"
//!     },
//!     "groupUIDAttribute": "dn",
//!     "groupNameAttributes": ["cn"],
//!     "groupMembershipAttributes": ["memberUid"],
//!     "usersQuery": {
//!         "baseDN": "ou=users,dc=example,dc=com",
//!         "filter": "(objectClass=inetOrgPerson)"
//!     },
//!     "userUIDAttribute": "uid",
//!     "userNameAttributes": ["uid"]
//! }"#).unwrap();
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::query::AttributeQuery;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to search for one kind of entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDefinition {
    /// Root of the search.
    #[serde(rename = "baseDN", default)]
    pub base_dn: String,

    /// `base`, `one` or `sub`; empty means `sub`.
    #[serde(default)]
    pub scope: String,

    /// `never`, `search`, `base` or `always`; empty means `never`.
    #[serde(default)]
    pub deref_aliases: String,

    /// Server-side time limit in seconds; 0 means none.
    #[serde(rename = "timeout", default)]
    pub time_limit: u32,

    /// Filter selecting every in-scope entry.
    #[serde(default)]
    pub filter: String,

    /// Page size for paged searches; 0 disables paging.
    #[serde(default)]
    pub page_size: u32,
}

impl QueryDefinition {
    /// Subtree search at `base_dn` with `filter`.
    pub fn new(base_dn: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            filter: filter.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_deref_aliases(mut self, deref_aliases: impl Into<String>) -> Self {
        self.deref_aliases = deref_aliases.into();
        self
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = seconds;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// RFC2307 schema description: how groups, users and membership are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    /// Query selecting all in-scope groups.
    #[serde(rename = "groupsQuery")]
    pub group_query: QueryDefinition,

    /// Attribute holding the stable group identifier; `dn` uses the entry DN.
    #[serde(rename = "groupUIDAttribute")]
    pub group_uid_attribute: String,

    /// Ordered attributes for group names. `None` means no group name mapper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name_attributes: Option<Vec<String>>,

    /// Ordered attributes listing a group's members.
    #[serde(default)]
    pub group_membership_attributes: Vec<String>,

    /// Query selecting all in-scope users.
    #[serde(rename = "usersQuery")]
    pub user_query: QueryDefinition,

    /// Attribute holding the stable user identifier.
    #[serde(rename = "userUIDAttribute")]
    pub user_uid_attribute: String,

    /// Ordered attributes for user names.
    #[serde(default)]
    pub user_name_attributes: Vec<String>,

    /// Skip members whose entries cannot be found.
    #[serde(default)]
    pub tolerate_member_not_found_errors: bool,

    /// Skip members that live outside the user query's base DN.
    #[serde(default)]
    pub tolerate_member_out_of_scope_errors: bool,
}

impl SchemaConfig {
    /// Create a config from the two queries and their UID attributes.
    ///
    /// Name and membership attributes start empty and must be set before
    /// the config validates.
    pub fn new(
        group_query: QueryDefinition,
        group_uid_attribute: impl Into<String>,
        user_query: QueryDefinition,
        user_uid_attribute: impl Into<String>,
    ) -> Self {
        Self {
            group_query,
            group_uid_attribute: group_uid_attribute.into(),
            group_name_attributes: None,
            group_membership_attributes: Vec::new(),
            user_query,
            user_uid_attribute: user_uid_attribute.into(),
            user_name_attributes: Vec::new(),
            tolerate_member_not_found_errors: false,
            tolerate_member_out_of_scope_errors: false,
        }
    }

    /// Deserialize and validate a JSON configuration document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SchemaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_group_name_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_name_attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_group_membership_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_membership_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_user_name_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_name_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn tolerate_member_not_found(mut self, tolerate: bool) -> Self {
        self.tolerate_member_not_found_errors = tolerate;
        self
    }

    pub fn tolerate_member_out_of_scope(mut self, tolerate: bool) -> Self {
        self.tolerate_member_out_of_scope_errors = tolerate;
        self
    }

    /// Check the attribute lists without compiling the queries.
    pub fn validate_attributes(&self) -> ConfigResult<()> {
        require_attribute("groupUIDAttribute", &self.group_uid_attribute)?;
        require_attribute("userUIDAttribute", &self.user_uid_attribute)?;

        if let Some(names) = &self.group_name_attributes {
            require_list("groupNameAttributes", names)?;
        }
        require_list("groupMembershipAttributes", &self.group_membership_attributes)?;
        require_list("userNameAttributes", &self.user_name_attributes)?;
        Ok(())
    }

    /// Validate attribute lists and compile both queries.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_attributes()?;
        AttributeQuery::new(&self.group_query, &self.group_uid_attribute)?;
        AttributeQuery::new(&self.user_query, &self.user_uid_attribute)?;
        Ok(())
    }

    /// Attributes requested on every group search.
    pub fn group_attributes(&self) -> Vec<String> {
        let names = self.group_name_attributes.iter().flatten();
        collect_attributes(
            std::iter::once(&self.group_uid_attribute)
                .chain(names)
                .chain(&self.group_membership_attributes),
        )
    }

    /// Attributes requested on every user search.
    pub fn user_attributes(&self) -> Vec<String> {
        collect_attributes(
            std::iter::once(&self.user_uid_attribute).chain(&self.user_name_attributes),
        )
    }
}

/// Distinct attribute names in first-seen order, minus the `dn` pseudo attribute.
fn collect_attributes<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut attributes: Vec<String> = Vec::new();
    for name in names {
        if crate::entry::is_dn_attribute(name) {
            continue;
        }
        if !attributes.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            attributes.push(name.clone());
        }
    }
    attributes
}

fn require_attribute(field: &str, attribute: &str) -> ConfigResult<()> {
    if attribute.trim().is_empty() {
        return Err(ConfigError::empty_attribute(field));
    }
    Ok(())
}

fn require_list(field: &str, attributes: &[String]) -> ConfigResult<()> {
    if attributes.is_empty() {
        return Err(ConfigError::missing_attributes(field));
    }
    for attribute in attributes {
        require_attribute(field, attribute)?;
    }
    Ok(())
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_operation_timeout() -> u64 {
    60
}

/// Everything needed to reach the directory. Opaque to the builder.
///
/// An `ldap://` URL upgrades with StartTLS unless `insecure` is set;
/// `ldaps://` always uses TLS.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParameters {
    /// `ldap://host[:port]` or `ldaps://host[:port]`.
    pub url: String,

    /// DN to bind as; empty binds anonymously.
    #[serde(rename = "bindDN", default)]
    pub bind_dn: String,

    /// Password for `bind_dn`.
    #[serde(default, skip_serializing)]
    pub bind_password: Option<String>,

    /// Connect without TLS.
    #[serde(default)]
    pub insecure: bool,

    /// Skip certificate verification on TLS connections.
    #[serde(rename = "skipTLSVerify", default)]
    pub skip_tls_verify: bool,

    /// Connection establishment timeout in seconds.
    #[serde(rename = "connectTimeout", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Client-side limit in seconds on each bind or search round-trip.
    #[serde(rename = "operationTimeout", default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

impl std::fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("insecure", &self.insecure)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("operation_timeout_secs", &self.operation_timeout_secs)
            .finish()
    }
}

impl ConnectionParameters {
    /// Anonymous connection parameters for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bind_dn: String::new(),
            bind_password: None,
            insecure: false,
            skip_tls_verify: false,
            connect_timeout_secs: default_connect_timeout(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }

    /// Bind with a DN and password.
    pub fn with_bind(mut self, bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.bind_dn = bind_dn.into();
        self.bind_password = Some(password.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    pub fn with_operation_timeout(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }

    /// Connection establishment timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Limit on a single bind or search round-trip.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Whether a plain `ldap://` connection should be upgraded with StartTLS.
    pub fn uses_start_tls(&self) -> bool {
        self.url.starts_with("ldap://") && !self.insecure
    }

    /// Validate URL scheme and credential combinations.
    pub fn validate(&self) -> ConfigResult<()> {
        let host = if let Some(rest) = self.url.strip_prefix("ldaps://") {
            if self.insecure {
                return Err(ConfigError::invalid_url(
                    &self.url,
                    "ldaps cannot be combined with insecure",
                ));
            }
            rest
        } else if let Some(rest) = self.url.strip_prefix("ldap://") {
            rest
        } else {
            return Err(ConfigError::invalid_url(
                &self.url,
                "scheme must be ldap:// or ldaps://",
            ));
        };

        if host.split('/').next().is_none_or(str::is_empty) {
            return Err(ConfigError::invalid_url(&self.url, "host is missing"));
        }

        if self.insecure && self.skip_tls_verify {
            return Err(ConfigError::invalid(
                "skipTLSVerify has no effect on an insecure connection",
            ));
        }

        if self.connect_timeout_secs == 0 || self.operation_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "connectTimeout and operationTimeout must be at least one second",
            ));
        }

        if self.bind_dn.is_empty() && self.bind_password.is_some() {
            return Err(ConfigError::invalid(
                "bindPassword requires bindDN to be set",
            ));
        }

        Ok(())
    }
}
