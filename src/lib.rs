//! Capability builders for synchronizing RFC2307 directory groups.
//!
//! A group-sync engine needs a handful of narrow capabilities: list the
//! groups in scope, map a group to a local name, map a user entry to a user
//! name, resolve a group's members, and detect whether a group still exists.
//! This crate builds those capabilities for directories laid out per RFC2307,
//! where group entries list their members directly.
//!
//! # Core Components
//!
//! - [`Rfc2307Builder`] - Hands out every capability over one lazily built adapter
//! - [`SchemaConfig`] - Queries and attribute lists describing the directory layout
//! - [`ErrorHandler`] - Decides whether a per-entry failure skips or aborts
//! - [`DirectoryClient`] - Seam between the capabilities and the wire protocol
//!
//! # Quick Start
//!
//! ```rust
//! use group_sync_builders::{ConnectionParameters, QueryDefinition, Rfc2307Builder, SchemaConfig};
//! use group_sync_builders::directory::InMemoryDirectory;
//! use group_sync_builders::entry::Entry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = InMemoryDirectory::with_entries([
//!     Entry::new("cn=ops,ou=groups,dc=example,dc=com")
//!         .with_attribute("objectClass", ["posixGroup"])
//!         .with_attribute("cn", ["ops"])
//!         .with_attribute("memberUid", ["alice"]),
//!     Entry::new("uid=alice,ou=users,dc=example,dc=com")
//!         .with_attribute("objectClass", ["inetOrgPerson"])
//!         .with_attribute("uid", ["alice"]),
//! ]);
//!
//! let config = SchemaConfig::new(
//!     QueryDefinition::new("ou=groups,dc=example,dc=com", "(objectClass=posixGroup)"),
//!     "cn",
//!     QueryDefinition::new("ou=users,dc=example,dc=com", "(objectClass=inetOrgPerson)"),
//!     "uid",
//! )
//! .with_group_membership_attributes(["memberUid"])
//! .with_user_name_attributes(["uid"]);
//!
//! let builder = Rfc2307Builder::new(
//!     ConnectionParameters::new("ldap://directory.example.com"),
//!     config,
//!     directory,
//! );
//!
//! let groups = builder.group_lister()?.list_groups().await?;
//! let members = builder.group_member_extractor()?.extract_members(&groups[0]).await?;
//! let mapper = builder.user_name_mapper()?;
//! let names = members
//!     .iter()
//!     .map(|m| mapper.user_name_for(m))
//!     .collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(names, vec!["alice"]);
//! # Ok(())
//! # }
//! ```
//!
//! Enable the `ldap` feature for [`directory::LdapConnector`], which talks to a
//! live server through `ldap3`.

pub mod builder;
pub mod capabilities;
pub mod config;
pub mod directory;
pub mod dn;
pub mod entry;
pub mod error;
pub mod error_policy;
pub mod filter;
pub mod mapper;
pub mod query;
pub mod rfc2307;

// Re-export commonly used types for convenience
pub use builder::{PruneBuilder, Rfc2307Builder, SyncBuilder};
pub use capabilities::{
    GroupDetector, GroupEntryLookup, GroupLister, GroupNameMapper, MemberExtractor,
    UserNameMapper,
};
pub use config::{ConnectionParameters, QueryDefinition, SchemaConfig};
pub use directory::{DirectoryClient, DirectoryConnector, InMemoryDirectory, SearchRequest};
pub use entry::Entry;
pub use error::{BuildError, ConfigError, DirectoryError, SyncError, SyncResult};
pub use error_policy::{ErrorDecision, ErrorHandler, ErrorPolicy};
pub use rfc2307::Rfc2307Directory;
