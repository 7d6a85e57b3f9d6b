//! Directory client abstraction.
//!
//! The sync capabilities never speak a wire protocol themselves. They hand a
//! [`SearchRequest`] to a [`DirectoryClient`] and get entries back. A
//! [`DirectoryConnector`] turns [`ConnectionParameters`] into a client and is
//! invoked exactly once per builder, when the shared adapter is constructed.
//!
//! # Backends
//!
//! * [`InMemoryDirectory`] - evaluates filters and scopes locally; used for
//!   tests and dry runs
//! * `LdapConnector` - talks to a live server through `ldap3` (requires the
//!   `ldap` feature)
//!
//! # Example Usage
//!
//! ```rust
//! use group_sync_builders::directory::{DirectoryClient, InMemoryDirectory, SearchRequest};
//! use group_sync_builders::entry::Entry;
//! use group_sync_builders::filter::Filter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::new();
//! directory
//!     .insert(Entry::new("cn=ops,ou=groups,dc=example,dc=com").with_attribute("cn", ["ops"]))
//!     .await;
//!
//! let request = SearchRequest::subtree("ou=groups,dc=example,dc=com".parse()?, Filter::present("cn"));
//! let found = directory.search(&request).await?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod in_memory;
#[cfg(feature = "ldap")]
pub mod ldap;

pub use in_memory::InMemoryDirectory;
#[cfg(feature = "ldap")]
pub use ldap::{LdapClient, LdapConnector};

use crate::config::ConnectionParameters;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::DirectoryResult;
use crate::filter::Filter;
use crate::query::{DerefAliases, Scope};
use std::future::Future;

/// A fully resolved search, ready to execute.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base_dn: Dn,
    pub scope: Scope,
    pub deref_aliases: DerefAliases,
    /// Server-side time limit in seconds; 0 means none.
    pub time_limit: u32,
    pub filter: Filter,
    /// Attributes to return; empty requests all user attributes.
    pub attributes: Vec<String>,
    /// Page size for paged searches; 0 disables paging.
    pub page_size: u32,
}

impl SearchRequest {
    /// Unpaged subtree search returning all attributes.
    pub fn subtree(base_dn: Dn, filter: Filter) -> Self {
        Self {
            base_dn,
            scope: Scope::Subtree,
            deref_aliases: DerefAliases::Never,
            time_limit: 0,
            filter,
            attributes: Vec::new(),
            page_size: 0,
        }
    }
}

/// Executes searches against a directory.
///
/// Implementations must be shareable across tasks; the adapter built on top
/// of a client is used concurrently by every capability it backs.
pub trait DirectoryClient: Send + Sync + 'static {
    /// Run a search and return every matching entry.
    ///
    /// # Errors
    /// - [`DirectoryError::NoSuchObject`](crate::error::DirectoryError::NoSuchObject)
    ///   when the search base does not exist
    /// - any transport, authentication or timeout failure
    fn search(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = DirectoryResult<Vec<Entry>>> + Send;
}

/// Produces a [`DirectoryClient`] from connection parameters.
pub trait DirectoryConnector: Send + Sync {
    type Client: DirectoryClient;

    /// Prepare a client. Must not run any search.
    fn open(&self, parameters: &ConnectionParameters) -> DirectoryResult<Self::Client>;
}
