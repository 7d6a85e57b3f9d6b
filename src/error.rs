//! Error types for capability assembly and directory synchronization.
//!
//! Errors are split by when they can happen:
//!
//! * [`ConfigError`] - malformed schema or connection configuration, detected
//!   before any directory connection is opened
//! * [`DirectoryError`] - failures reported by a directory client
//! * [`SyncError`] - per-entry failures while a capability is in use; these
//!   are routed through an [`ErrorHandler`](crate::error_policy::ErrorHandler)
//! * [`BuildError`] - what a builder accessor can return

use std::time::Duration;

/// Configuration errors raised while validating schema or connection settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Filter expression did not parse
    #[error("Invalid query filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Distinguished name did not parse
    #[error("Invalid DN '{dn}': {reason}")]
    InvalidDn { dn: String, reason: String },

    /// Unknown search scope
    #[error("Invalid search scope '{0}', expected one of: base, one, sub")]
    InvalidScope(String),

    /// Unknown alias dereferencing policy
    #[error("Invalid alias dereferencing '{0}', expected one of: never, search, base, always")]
    InvalidDerefAliases(String),

    /// An attribute name was empty
    #[error("Attribute name for '{field}' cannot be empty")]
    EmptyAttribute { field: String },

    /// A required attribute list was empty
    #[error("At least one attribute is required for '{field}'")]
    MissingAttributes { field: String },

    /// Connection URL is malformed or uses an unsupported scheme
    #[error("Invalid connection URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Any other invalid combination of settings
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    /// Configuration document could not be deserialized
    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a directory client while executing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    /// Could not reach or set up a session with the directory
    #[error("Connection failed: {message}")]
    Connection { message: String },

    /// Bind credentials were rejected
    #[error("Authentication failed for '{bind_dn}'")]
    Authentication { bind_dn: String },

    /// The directory did not answer in time
    #[error("Directory operation timed out after {0:?}")]
    Timeout(Duration),

    /// The search base does not exist
    #[error("No such object: {dn}")]
    NoSuchObject { dn: String },

    /// Any other failed operation
    #[error("Directory operation failed: {message}")]
    Operation { message: String },
}

/// Per-entry failures raised while listing, mapping, extracting or detecting.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A single-entry search matched nothing
    #[error("Search at '{base_dn}' with filter '{filter}' returned no entries")]
    EntryNotFound { base_dn: String, filter: String },

    /// A single-entry search matched more than one entry
    #[error(
        "Search at '{base_dn}' with filter '{filter}' returned {count} entries, expected exactly one"
    )]
    MultipleEntries {
        base_dn: String,
        filter: String,
        count: usize,
    },

    /// A DN-keyed lookup pointed outside the query base
    #[error("DN '{dn}' is outside the query base '{base_dn}'")]
    QueryOutOfBounds { dn: String, base_dn: String },

    /// A DN-keyed lookup was given a value that is not a DN
    #[error("Lookup value '{value}' is not a valid DN: {reason}")]
    InvalidDn { value: String, reason: String },

    /// Entry lacks the attribute it is keyed on
    #[error("Entry '{dn}' has no value for UID attribute '{attribute}'")]
    MissingUid { dn: String, attribute: String },

    /// None of the configured name attributes produced a value
    #[error("Entry '{dn}' has no value for any of the name attributes {attributes:?}")]
    Mapping { dn: String, attributes: Vec<String> },

    /// Resolving one member of a group failed
    #[error("Failed to look up member '{member_uid}' of group '{group_uid}': {source}")]
    MemberLookup {
        group_uid: String,
        member_uid: String,
        #[source]
        source: Box<SyncError>,
    },

    /// The error policy chose to skip this entry
    #[error("Skipped by error policy: {0}")]
    Skipped(#[source] Box<SyncError>),

    /// Failure reported by the directory client
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Errors returned by builder accessors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Schema configuration is invalid
    #[error("Invalid sync configuration: {0}")]
    Config(#[from] ConfigError),

    /// Connector could not produce a directory client
    #[error("Failed to open directory client: {0}")]
    Connect(#[from] DirectoryError),
}

impl ConfigError {
    /// Create an invalid filter error
    pub fn invalid_filter(filter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            filter: filter.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid DN error
    pub fn invalid_dn(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDn {
            dn: dn.into(),
            reason: reason.into(),
        }
    }

    /// Create an empty attribute error
    pub fn empty_attribute(field: impl Into<String>) -> Self {
        Self::EmptyAttribute {
            field: field.into(),
        }
    }

    /// Create a missing attribute list error
    pub fn missing_attributes(field: impl Into<String>) -> Self {
        Self::MissingAttributes {
            field: field.into(),
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a generic invalid configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

impl DirectoryError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a generic operation error
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
        }
    }
}

impl SyncError {
    /// Create a member lookup error wrapping the underlying cause
    pub fn member_lookup(
        group_uid: impl Into<String>,
        member_uid: impl Into<String>,
        source: SyncError,
    ) -> Self {
        Self::MemberLookup {
            group_uid: group_uid.into(),
            member_uid: member_uid.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error means "there is no such entry".
    ///
    /// Covers empty searches and searches whose base does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SyncError::EntryNotFound { .. }
                | SyncError::Directory(DirectoryError::NoSuchObject { .. })
        )
    }

    /// Whether the error is a lookup outside the query base.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, SyncError::QueryOutOfBounds { .. })
    }

    /// Whether the error policy elected to skip the failing entry.
    pub fn is_skippable(&self) -> bool {
        matches!(self, SyncError::Skipped(_))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DirectoryResult<T> = Result<T, DirectoryError>;
pub type SyncResult<T> = Result<T, SyncError>;
pub type BuildResult<T> = Result<T, BuildError>;
